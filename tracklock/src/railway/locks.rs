//! Mutual exclusion on track segments.
//!
//! A segment is the run of track between two switches or ends. It is
//! identified by the boundary points found walking both ways, each
//! marked with the heading it was reached with, so that two tracks
//! joining the same pair of switches still get different locks.

use crate::input::trackmap::*;
use crate::input::trackmap_parser::MAX_WIDTH;
use crate::link::VehicleId;
use super::track::Track;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    /// Canonical boundary markers, smallest first.
    Segment(Point, Point),
    /// A closed loop without switches, by its smallest point.
    Loop(Point),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LockKey::Segment(a, b) => write!(f, "segment {}-{}", a, b),
            LockKey::Loop(p) => write!(f, "loop {}", p),
        }
    }
}

/// Boundary point shifted along x by its approach heading.
pub fn boundary_marker(pos: Point, approach: Direction) -> Point {
    Point::new(pos.x + MAX_WIDTH * approach.index() as i32, pos.y)
}

impl Track {
    /// Panics unless `pos` is a plain two-exit cell.
    pub fn segment_key(&self, pos: Point) -> LockKey {
        let exits = self.grid.exits(pos);
        if exits != 2 {
            panic!("segment lock requested at {} which has {} exits", pos, exits);
        }
        // The seeds only need to differ: from a two-exit cell they settle
        // on the two ways out.
        let a = self.next_switch_or_end(pos, Direction::East);
        let b = self.next_switch_or_end(pos, Direction::West);
        match (a, b) {
            (Some(a), Some(b)) => {
                let a = boundary_marker(a.pos, a.direction);
                let b = boundary_marker(b.pos, b.direction);
                LockKey::Segment(a.min(b), a.max(b))
            }
            _ => LockKey::Loop(self.loop_representative(pos)),
        }
    }
}

pub(crate) fn guard<T>(m: &Mutex<T>) -> MutexGuard<T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Fail)]
pub enum LockError {
    #[fail(display = "vehicle {} released {} held by {:?}", vehicle, key, holder)]
    NotHeld { vehicle: VehicleId, key: LockKey, holder: Option<VehicleId> },
}

/// Binary lock owned by at most one vehicle at a time.
#[derive(Debug)]
pub struct SegmentLock {
    key: LockKey,
    holder: Mutex<Option<VehicleId>>,
    released: Condvar,
}

impl SegmentLock {
    pub fn new(key: LockKey) -> SegmentLock {
        SegmentLock { key: key, holder: Mutex::new(None), released: Condvar::new() }
    }

    pub fn key(&self) -> LockKey { self.key }

    pub fn holder(&self) -> Option<VehicleId> {
        *guard(&self.holder)
    }

    pub fn try_acquire(&self, vehicle: VehicleId) -> bool {
        let mut holder = guard(&self.holder);
        if holder.is_some() {
            return false;
        }
        *holder = Some(vehicle);
        true
    }

    /// Blocks until the lock is free, then takes it.
    pub fn acquire(&self, vehicle: VehicleId) {
        let mut holder = guard(&self.holder);
        while holder.is_some() {
            holder = self.released.wait(holder).unwrap_or_else(PoisonError::into_inner);
        }
        *holder = Some(vehicle);
    }

    pub fn release(&self, vehicle: VehicleId) -> Result<(), LockError> {
        let mut holder = guard(&self.holder);
        if *holder != Some(vehicle) {
            return Err(LockError::NotHeld { vehicle: vehicle, key: self.key, holder: *holder });
        }
        *holder = None;
        self.released.notify_one();
        Ok(())
    }
}

/// Process-wide table of segment locks. Locks are made on first use and
/// live as long as the registry.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<LockKey, Arc<SegmentLock>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn lock_for_key(&self, key: LockKey) -> Arc<SegmentLock> {
        let mut locks = guard(&self.locks);
        locks.entry(key).or_insert_with(|| {
            debug!("New lock for {}", key);
            Arc::new(SegmentLock::new(key))
        }).clone()
    }

    /// Lock of the segment holding the two-exit cell `pos`.
    pub fn segment_lock_for(&self, track: &Track, pos: Point) -> Arc<SegmentLock> {
        self.lock_for_key(track.segment_key(pos))
    }

    pub fn len(&self) -> usize {
        guard(&self.locks).len()
    }

    /// Locks currently held, for diagnostics.
    pub fn held(&self) -> Vec<(LockKey, VehicleId)> {
        let locks = guard(&self.locks);
        let mut held = locks.values()
            .filter_map(|l| l.holder().map(|v| (l.key(), v)))
            .collect::<Vec<_>>();
        held.sort();
        held
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::siding;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use super::*;

    #[test]
    fn same_segment_same_lock() {
        let t = siding();
        let r = LockRegistry::new();
        let a = r.segment_lock_for(&t, Point::new(1, 1));
        let b = r.segment_lock_for(&t, Point::new(1, 1));
        let c = r.segment_lock_for(&t, Point::new(2, 1));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(r.len(), 1);

        let middle = r.segment_lock_for(&t, Point::new(4, 1));
        assert!(!Arc::ptr_eq(&a, &middle));
        let east = r.segment_lock_for(&t, Point::new(7, 1));
        assert!(!Arc::ptr_eq(&middle, &east));
        assert!(Arc::ptr_eq(&east, &r.segment_lock_for(&t, Point::new(6, 1))));
    }

    #[test]
    fn parallel_tracks_between_same_switches() {
        let t = siding();
        let r = LockRegistry::new();
        let main = r.segment_lock_for(&t, Point::new(4, 1));
        let upper = r.segment_lock_for(&t, Point::new(4, 0));
        assert!(!Arc::ptr_eq(&main, &upper));
        assert!(Arc::ptr_eq(&upper, &r.segment_lock_for(&t, Point::new(3, 0))));
        assert!(Arc::ptr_eq(&upper, &r.segment_lock_for(&t, Point::new(5, 0))));
        assert_eq!(t.segment_key(Point::new(4, 1)),
                   LockKey::Segment(Point::new(5, 1), Point::new(3 + 2 * MAX_WIDTH, 1)));
        assert_eq!(t.segment_key(Point::new(4, 0)),
                   LockKey::Segment(Point::new(3 + MAX_WIDTH, 1), Point::new(5 + MAX_WIDTH, 1)));
    }

    #[test]
    #[should_panic]
    fn switch_has_no_segment() {
        siding().segment_key(Point::new(3, 1));
    }

    #[test]
    fn release_by_other_vehicle_is_refused() {
        let lock = SegmentLock::new(LockKey::Loop(Point::new(0, 0)));
        assert!(lock.try_acquire(1));
        assert!(!lock.try_acquire(2));
        assert!(lock.release(2).is_err());
        assert_eq!(lock.holder(), Some(1));
        lock.release(1).unwrap();
        assert_eq!(lock.holder(), None);
    }

    #[test]
    fn one_holder_under_contention() {
        let lock = Arc::new(SegmentLock::new(LockKey::Loop(Point::new(0, 0))));
        let inside = Arc::new(AtomicUsize::new(0));
        let handles = (1..9).map(|vehicle| {
            let lock = lock.clone();
            let inside = inside.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    if i % 2 == 0 || !lock.try_acquire(vehicle) {
                        lock.acquire(vehicle);
                    }
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    assert_eq!(lock.holder(), Some(vehicle));
                    thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                    lock.release(vehicle).unwrap();
                }
            })
        }).collect::<Vec<_>>();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(lock.holder(), None);
    }

    #[test]
    fn registry_is_shared_between_threads() {
        let t = Arc::new(siding());
        let r = Arc::new(LockRegistry::new());
        let locks = (0..4).map(|_| {
            let (t, r) = (t.clone(), r.clone());
            thread::spawn(move || r.segment_lock_for(&t, Point::new(4, 1)))
        }).map(|h| h.join().unwrap()).collect::<Vec<_>>();
        assert!(locks.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(r.len(), 1);
    }
}
