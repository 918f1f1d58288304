use crate::input::trackmap::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellKind {
    /// No rail at all.
    Empty,
    End,
    Straight,
    Switch,
    Crossing,
}

impl Grid {
    /// Both the connection cell and the neighbour's center must be rail.
    pub fn can_move(&self, from: Point, dir: Direction) -> bool {
        let (dx, dy) = dir.delta();
        (1..3).all(|k| {
            let x = detailed(from.x) + dx * k;
            let y = detailed(from.y) + dy * k;
            self.valid_detail(x, y) && self.detail(x, y) > 0
        })
    }

    pub fn exits(&self, p: Point) -> usize {
        Direction::ALL.iter().filter(|&&d| self.can_move(p, d)).count()
    }

    pub fn classify(&self, p: Point) -> CellKind {
        match self.exits(p) {
            0 => CellKind::Empty,
            1 => CellKind::End,
            2 => CellKind::Straight,
            3 => CellKind::Switch,
            _ => CellKind::Crossing,
        }
    }

    pub fn is_switch(&self, p: Point) -> bool { self.classify(p) == CellKind::Switch }
    pub fn is_crossing(&self, p: Point) -> bool { self.classify(p) == CellKind::Crossing }
    pub fn is_end(&self, p: Point) -> bool { self.classify(p) == CellKind::End }

    /// All coarse points of the map, row by row.
    pub fn points(&self) -> impl Iterator<Item = Point> {
        let width = self.width();
        (0..self.height()).flat_map(move |y| (0..width).map(move |x| Point::new(x, y)))
    }
}
