use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Cell position in the coarse grid of the map file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point {
        Point { x: x, y: y }
    }

    pub fn step(self, dir: Direction) -> Point {
        let (dx, dy) = dir.delta();
        Point { x: self.x + dx, y: self.y + dy }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compass direction. The index order is significant: turning clockwise
/// adds one, and every preference rule in the topology is written
/// against it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    East,
    South,
    West,
    North,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::East, Direction::South, Direction::West, Direction::North];

    pub fn index(self) -> usize {
        match self {
            Direction::East => 0,
            Direction::South => 1,
            Direction::West => 2,
            Direction::North => 3,
        }
    }

    pub fn from_index(i: usize) -> Direction {
        Direction::ALL[i % 4]
    }

    /// +90 degrees.
    pub fn turn_cw(self) -> Direction {
        Direction::from_index(self.index() + 1)
    }

    /// -90 degrees.
    pub fn turn_ccw(self) -> Direction {
        Direction::from_index(self.index() + 3)
    }

    pub fn reverse(self) -> Direction {
        Direction::from_index(self.index() + 2)
    }

    /// Unit step, with y growing southwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::North => (0, -1),
        }
    }

    /// Name as it appears inside rail tokens of the map file.
    pub fn name(self) -> &'static str {
        match self {
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
            Direction::North => "North",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Direction, String> {
        match s.to_lowercase().as_str() {
            "east" | "e" => Ok(Direction::East),
            "south" | "s" => Ok(Direction::South),
            "west" | "w" => Ok(Direction::West),
            "north" | "n" => Ok(Direction::North),
            _ => Err(s.to_string()),
        }
    }
}

/// Rail piece of a map record.
#[derive(Clone, Debug, PartialEq)]
pub enum Rail {
    Horizontal,
    Vertical,
    /// Curve or switch leg connecting the named neighbours.
    Branch(SmallVec<[Direction; 4]>),
}

/// Detailed-resolution occupancy grid. Coarse coordinate `v` maps to
/// detailed coordinate `2v + 1`; the cells in between hold the
/// connections to the neighbours.
///
/// Cell values: 0 is wall, 1 or more is rail, 5 or more marks a branch
/// footprint (a connection contributed by a curve or switch leg).
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<u8>,
}

pub const BRANCH_FOOTPRINT: u8 = 5;

pub fn detailed(v: i32) -> i32 {
    v * 2 + 1
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Grid {
        let cells = vec![0; (detailed(width) * detailed(height)) as usize];
        Grid { width: width, height: height, cells: cells }
    }

    pub fn width(&self) -> i32 { self.width }
    pub fn height(&self) -> i32 { self.height }

    /// True if the coarse point lies inside the map.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    pub fn valid_detail(&self, x: i32, y: i32) -> bool {
        x > 0 && y > 0 && x < detailed(self.width) && y < detailed(self.height)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= detailed(self.width) || y >= detailed(self.height) {
            return None;
        }
        Some((y * detailed(self.width) + x) as usize)
    }

    /// Raw detailed cell value, 0 outside the array.
    pub fn detail(&self, x: i32, y: i32) -> u8 {
        self.index(x, y).map(|i| self.cells[i]).unwrap_or(0)
    }

    /// Detailed value of the connection cell next to `p` in `dir`.
    pub fn neighbour_detail(&self, p: Point, dir: Direction) -> u8 {
        let (dx, dy) = dir.delta();
        self.detail(detailed(p.x) + dx, detailed(p.y) + dy)
    }

    fn add(&mut self, x: i32, y: i32, amount: u8) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = self.cells[i].saturating_add(amount);
        }
    }

    pub fn add_rail(&mut self, p: Point, rail: &Rail) {
        let x = detailed(p.x);
        let y = detailed(p.y);
        if let Some(i) = self.index(x, y) {
            self.cells[i] = 1;
        }
        match *rail {
            Rail::Horizontal => {
                self.add(x + 1, y, 1);
                self.add(x - 1, y, 1);
            }
            Rail::Vertical => {
                self.add(x, y + 1, 1);
                self.add(x, y - 1, 1);
            }
            Rail::Branch(ref dirs) => {
                for dir in dirs.iter() {
                    let (dx, dy) = dir.delta();
                    self.add(x + dx, y + dy, BRANCH_FOOTPRINT);
                }
            }
        }
    }
}

/// Everything the map file describes.
#[derive(Clone, Debug)]
pub struct TrackMap {
    pub grid: Grid,
    pub sensors: Vec<Point>,
    /// Start position of vehicle N is `starts[N - 1]`.
    pub starts: Vec<Point>,
}
