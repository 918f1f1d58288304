use crate::input::trackmap::*;
use super::track::Track;
use log::debug;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

pub const TRACK_COST: u64 = 1;
pub const SENSOR_COST: u64 = 1000;
pub const WALL_COST: u64 = 1_000_000;

#[derive(Debug, Fail)]
pub enum RoutingError {
    #[fail(display = "no way from {} to sensor {}", from, to)]
    Unreachable { from: Point, to: Point },
}

#[derive(Eq, PartialEq, Debug)]
struct QueuedPoint {
    cost: u64,
    id: usize,
    point: Point,
}

impl Ord for QueuedPoint {
    fn cmp(&self, other: &QueuedPoint) -> Ordering {
        // Flipped to turn the (maximum) BinaryHeap into a minimum heap,
        // first queued wins ties.
        other.cost.cmp(&self.cost).
            then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueuedPoint {
    fn partial_cmp(&self, other: &QueuedPoint) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Track {
    /// Heading a vehicle last seen at `prev` (going `prev_dir`) has when
    /// it triggers the sensor at `new`.
    ///
    /// Cheapest path search where plain track costs 1, passing another
    /// sensor 1000 and crossing a wall 1 000 000. The heading is the
    /// preferred direction at `new` for the step that reached it, or the
    /// step itself when `new` is a dead end.
    pub fn infer_direction(&self, prev: Point, new: Point, prev_dir: Direction) -> Result<Direction, RoutingError> {
        if prev == new {
            debug!("Same sensor {} again, keeping preferred heading", new);
            return Ok(self.grid.preferred_direction(prev, prev_dir).unwrap_or(prev_dir));
        }

        let mut queue = BinaryHeap::new();
        let mut visited = HashSet::new();
        let mut id_counter = 0;
        queue.push(QueuedPoint { cost: 0, id: id_counter, point: prev });

        while let Some(QueuedPoint { cost, point, .. }) = queue.pop() {
            if !visited.insert(point) {
                continue;
            }
            for &dir in Direction::ALL.iter() {
                let next = point.step(dir);
                let legal = self.grid.can_move(point, dir);
                if next == new && legal {
                    let heading = self.grid.preferred_direction(next, dir).unwrap_or(dir);
                    debug!("Reached {} from {} going {}, heading {} (cost {})", new, prev, dir, heading, cost);
                    return Ok(heading);
                }
                if !self.grid.contains(next) {
                    continue;
                }
                let step = if self.is_sensor(next) {
                    SENSOR_COST
                } else if legal {
                    TRACK_COST
                } else {
                    WALL_COST
                };
                id_counter += 1;
                queue.push(QueuedPoint { cost: cost + step, id: id_counter, point: next });
            }
        }

        Err(RoutingError::Unreachable { from: prev, to: new })
    }
}

#[test]
fn test_ordering() {
    let mut p = BinaryHeap::new();
    p.push(QueuedPoint { cost: 1000, id: 0, point: Point::new(0, 0) });
    p.push(QueuedPoint { cost: 1, id: 1, point: Point::new(1, 0) });
    p.push(QueuedPoint { cost: 1, id: 2, point: Point::new(2, 0) });
    assert_eq!(p.pop().unwrap().point, Point::new(1, 0));
    assert_eq!(p.pop().unwrap().point, Point::new(2, 0));
    assert_eq!(p.pop().unwrap().cost, 1000);
}
