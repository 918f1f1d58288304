use crate::input::trackmap::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SwitchPosition {
    Left,
    Right,
}

impl Grid {
    /// Position that lets a vehicle arriving at `switch` with heading
    /// `arrival` leave it with heading `departure`.
    ///
    /// The parity fold below is tied to how footprints are laid down by
    /// `Grid::add_rail` and has only been checked against the switch
    /// shapes of the TrainLineFile maps (see the tests).
    pub fn resolve_switch(&self, switch: Point, arrival: Direction, departure: Direction) -> SwitchPosition {
        let east = self.neighbour_detail(switch, Direction::East);
        let south = self.neighbour_detail(switch, Direction::South);
        let north = self.neighbour_detail(switch, Direction::North);

        let mut left = arrival != departure;
        left ^= east >= BRANCH_FOOTPRINT;
        left ^= south >= BRANCH_FOOTPRINT;
        left ^= north > 0 && south > 0;
        if left { SwitchPosition::Left } else { SwitchPosition::Right }
    }
}
