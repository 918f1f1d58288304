//! Directional walks over the track.
//!
//! A walk always continues straight when it can. At a switch the second
//! choice is the leg that is actually reachable from the side the walk
//! came in on, and the remaining turn comes last.

use crate::input::trackmap::*;
use super::track::Track;

/// Stop condition of a walk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    IsSwitch,
    IsCrossing,
    IsEnd,
    IsSwitchOrEnd,
    /// Any sensor other than the one at the given origin.
    IsOtherSensor(Point),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub pos: Point,
    /// Heading of the last step, i.e. the direction the point was
    /// approached from.
    pub direction: Direction,
    pub distance: usize,
}

impl Grid {
    /// Other leg of a switch for a vehicle arriving with heading
    /// `arrival`. Only defined when the vehicle entered through a branch
    /// footprint; then the first orthogonal footprint (clockwise first)
    /// is the leg.
    pub fn other_switch_direction(&self, switch: Point, arrival: Direction) -> Option<Direction> {
        if self.neighbour_detail(switch, arrival.reverse()) < BRANCH_FOOTPRINT {
            return None;
        }
        [arrival.turn_cw(), arrival.turn_ccw()].iter()
            .find(|&&d| self.neighbour_detail(switch, d) >= BRANCH_FOOTPRINT)
            .cloned()
    }

    pub fn preferred_direction(&self, p: Point, dir: Direction) -> Option<Direction> {
        let mut candidates = [dir, dir.turn_cw(), dir.turn_ccw()];
        if self.is_switch(p) {
            if let Some(alternative) = self.other_switch_direction(p, dir) {
                candidates[1] = alternative;
            }
        }
        candidates.iter().find(|&&d| self.can_move(p, d)).cloned()
    }
}

impl Track {
    pub fn satisfies(&self, predicate: Predicate, p: Point) -> bool {
        match predicate {
            Predicate::IsSwitch => self.grid.is_switch(p),
            Predicate::IsCrossing => self.grid.is_crossing(p),
            Predicate::IsEnd => self.grid.is_end(p),
            Predicate::IsSwitchOrEnd => self.grid.is_switch(p) || self.grid.is_end(p),
            Predicate::IsOtherSensor(origin) => p != origin && self.is_sensor(p),
        }
    }

    /// Upper bound on walk length: past this many steps some
    /// (point, heading) state has repeated and the walk is circling.
    pub fn walk_limit(&self) -> usize {
        4 * (self.grid.width() * self.grid.height()).max(1) as usize
    }

    pub fn search(&self, from: Point, dir0: Direction, predicate: Predicate) -> Option<SearchResult> {
        let mut now = from;
        let mut dir = dir0;
        let mut distance = 0;
        while !self.satisfies(predicate, now) {
            dir = self.grid.preferred_direction(now, dir)?;
            now = now.step(dir);
            distance += 1;
            if distance > self.walk_limit() {
                return None;
            }
        }
        Some(SearchResult { pos: now, direction: dir, distance: distance })
    }

    pub fn next_switch(&self, from: Point, dir: Direction) -> Option<SearchResult> {
        self.search(from, dir, Predicate::IsSwitch)
    }

    pub fn next_crossing(&self, from: Point, dir: Direction) -> Option<SearchResult> {
        self.search(from, dir, Predicate::IsCrossing)
    }

    pub fn next_switch_or_end(&self, from: Point, dir: Direction) -> Option<SearchResult> {
        self.search(from, dir, Predicate::IsSwitchOrEnd)
    }

    pub fn next_sensor(&self, from: Point, dir: Direction) -> Option<SearchResult> {
        self.search(from, dir, Predicate::IsOtherSensor(from))
    }

    /// Smallest point visited when walking the closed loop through `from`.
    pub fn loop_representative(&self, from: Point) -> Point {
        let mut now = from;
        let mut dir = Direction::East;
        let mut smallest = from;
        for _ in 0..self.walk_limit() {
            dir = match self.grid.preferred_direction(now, dir) {
                Some(d) => d,
                None => break,
            };
            now = now.step(dir);
            if now == from {
                break;
            }
            smallest = smallest.min(now);
        }
        smallest
    }
}
