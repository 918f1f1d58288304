//! Per-vehicle control loop.
//!
//! Each vehicle runs on its own thread, pulling its sensor events one by
//! one. The only feedback is which sensor fired, so the heading is
//! re-inferred from the previous sensor on every trigger, and the
//! reactions bound to (sensor, heading) decide what the vehicle does.

use crate::input::trackmap::*;
use crate::link::{Actuator, EventSource, SensorStatus, VehicleId, WaitError};
use crate::output::history::{VehicleLogEvent, VehicleLogger};
use super::actions::Action;
use super::inference::RoutingError;
use super::locks::{LockKey, LockRegistry, SegmentLock};
use super::track::Track;
use log::{debug, error, info, warn};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Fail)]
pub enum ControlError {
    #[fail(display = "vehicle {}: {}", _0, _1)]
    Routing(VehicleId, #[cause] RoutingError),
    #[fail(display = "vehicle {} tried to hold more than two segments", _0)]
    LockDiscipline(VehicleId),
    #[fail(display = "vehicle {} has no start position on plain track", _0)]
    NoStart(VehicleId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VehicleConfig {
    pub id: VehicleId,
    pub max_speed: i32,
    /// Pause between stopping and reversing in a turnaround.
    pub settle: Duration,
    pub creep_speed: i32,
}

impl VehicleConfig {
    pub fn new(id: VehicleId) -> VehicleConfig {
        VehicleConfig {
            id: id,
            max_speed: 15,
            settle: Duration::from_millis(1000),
            creep_speed: 1,
        }
    }
}

/// A vehicle holds its own segment lock and at most one more, the one it
/// is moving into.
const MAX_HELD: usize = 2;

pub struct Vehicle {
    config: VehicleConfig,
    track: Arc<Track>,
    registry: Arc<LockRegistry>,
    actuator: Arc<dyn Actuator>,
    events: Box<dyn EventSource>,
    velocity: i32,
    forwards: bool,
    position: Point,
    heading: Direction,
    held: SmallVec<[Arc<SegmentLock>; MAX_HELD]>,
    pending: HashMap<Point, Vec<Action>>,
    logger: Option<VehicleLogger>,
}

impl Vehicle {
    pub fn new(config: VehicleConfig, track: Arc<Track>, registry: Arc<LockRegistry>,
               actuator: Arc<dyn Actuator>, events: Box<dyn EventSource>) -> Result<Vehicle, ControlError> {
        let position = match track.start_position(config.id) {
            Some(p) if track.grid.exits(p) == 2 => p,
            _ => return Err(ControlError::NoStart(config.id)),
        };
        Ok(Vehicle {
            config: config,
            track: track,
            registry: registry,
            actuator: actuator,
            events: events,
            velocity: 0,
            forwards: true,
            position: position,
            heading: Direction::East,
            held: SmallVec::new(),
            pending: HashMap::new(),
            logger: None,
        })
    }

    pub fn with_logger(mut self, logger: VehicleLogger) -> Vehicle {
        self.logger = Some(logger);
        self
    }

    pub fn id(&self) -> VehicleId { self.config.id }
    pub fn position(&self) -> Point { self.position }
    pub fn heading(&self) -> Direction { self.heading }
    pub fn velocity(&self) -> i32 { self.velocity }

    pub fn held_locks(&self) -> Vec<LockKey> {
        self.held.iter().map(|l| l.key()).collect()
    }

    fn log(&self, event: VehicleLogEvent) {
        if let Some(ref logger) = self.logger {
            logger(event);
        }
    }

    /// Takes the start segment (waiting for it if need be), sets off and
    /// reacts to sensors until the event source closes.
    pub fn run(mut self) -> Result<(), ControlError> {
        let start = self.registry.segment_lock_for(&self.track, self.position);
        start.acquire(self.id());
        self.took(start);
        self.go();

        loop {
            let event = match self.events.next_event() {
                Ok(ev) => ev,
                Err(WaitError::Interrupted(msg)) => {
                    warn!("Vehicle {} interrupted while waiting for sensors: {}", self.id(), msg);
                    continue;
                }
                Err(WaitError::Closed) => {
                    info!("Vehicle {} shutting down", self.id());
                    return Ok(());
                }
            };
            if event.status == SensorStatus::Inactive {
                continue;
            }
            self.on_sensor(event.pos)?;
        }
    }

    /// Handles an activated sensor.
    pub fn on_sensor(&mut self, pos: Point) -> Result<(), ControlError> {
        if let Some(actions) = self.pending.remove(&pos) {
            let heading = self.heading;
            for action in &actions {
                self.perform(action, pos, heading)?;
            }
        }

        let id = self.id();
        let heading = self.track.infer_direction(self.position, pos, self.heading)
            .map_err(|e| ControlError::Routing(id, e))?;
        debug!("Vehicle {} at {} heading {}", id, pos, heading);
        self.log(VehicleLogEvent::Heading(pos, heading));

        let reaction = self.track.reaction(pos, heading).cloned();
        if let Some(reaction) = reaction {
            reaction.react(self, pos, heading)?;
        }

        self.position = pos;
        self.heading = heading;
        Ok(())
    }

    /// Registers an action to run once on the next trigger of `sensor`,
    /// after those already registered there.
    pub fn add_one_shot(&mut self, sensor: Point, action: Action) {
        self.pending.entry(sensor).or_insert_with(Vec::new).push(action);
    }

    pub fn perform(&mut self, action: &Action, at: Point, heading: Direction) -> Result<(), ControlError> {
        debug!("Vehicle {}: {}", self.id(), action);
        match *action {
            Action::Enter(p) => self.enter(p)?,
            Action::Acquire(p) => self.acquire(p)?,
            Action::Leave(p) => self.leave(p),
            Action::Switch(dir) => self.throw_switch(at, heading, dir),
            Action::TurnAround => self.turnaround(at),
            Action::Stop => self.stop(),
            Action::Go => self.go(),
            Action::Later(p, ref a) => self.add_one_shot(p, (**a).clone()),
        }
        Ok(())
    }

    fn signed_max(&self) -> i32 {
        if self.forwards { self.config.max_speed } else { -self.config.max_speed }
    }

    /// The new velocity is kept even when the command is rejected.
    pub fn set_velocity(&mut self, velocity: i32) {
        self.velocity = velocity;
        self.log(VehicleLogEvent::Speed(velocity));
        if let Err(e) = self.actuator.set_speed(self.id(), velocity) {
            error!("Vehicle {}: setting speed {}: {}", self.id(), velocity, e);
        }
    }

    pub fn stop(&mut self) {
        self.set_velocity(0);
    }

    pub fn go(&mut self) {
        let v = self.signed_max();
        self.set_velocity(v);
    }

    /// Ok(None) when the lock is already ours.
    fn lock_to_take(&self, p: Point) -> Result<Option<Arc<SegmentLock>>, ControlError> {
        let lock = self.registry.segment_lock_for(&self.track, p);
        if self.held.iter().any(|l| Arc::ptr_eq(l, &lock)) {
            debug!("Vehicle {} already holds {}", self.id(), lock.key());
            return Ok(None);
        }
        if self.held.len() >= MAX_HELD {
            return Err(ControlError::LockDiscipline(self.id()));
        }
        Ok(Some(lock))
    }

    fn took(&mut self, lock: Arc<SegmentLock>) {
        self.log(VehicleLogEvent::Acquired(lock.key()));
        self.held.push(lock);
    }

    /// Takes the segment if it is free, otherwise stops, waits for it and
    /// sets off again.
    pub fn enter(&mut self, p: Point) -> Result<(), ControlError> {
        if let Some(lock) = self.lock_to_take(p)? {
            if !lock.try_acquire(self.id()) {
                info!("Vehicle {} waiting for {}", self.id(), lock.key());
                self.stop();
                lock.acquire(self.id());
                self.go();
            }
            self.took(lock);
        }
        Ok(())
    }

    pub fn acquire(&mut self, p: Point) -> Result<(), ControlError> {
        if let Some(lock) = self.lock_to_take(p)? {
            lock.acquire(self.id());
            self.took(lock);
        }
        Ok(())
    }

    pub fn leave(&mut self, p: Point) {
        let lock = self.registry.segment_lock_for(&self.track, p);
        if let Some(i) = self.held.iter().position(|l| Arc::ptr_eq(l, &lock)) {
            self.held.remove(i);
        }
        match lock.release(self.id()) {
            Ok(()) => self.log(VehicleLogEvent::Released(lock.key())),
            Err(e) => error!("{}", e),
        }
    }

    /// Sets the first switch ahead of `at` so that the vehicle leaves it
    /// heading `departure`.
    pub fn throw_switch(&mut self, at: Point, heading: Direction, departure: Direction) {
        let found = match self.track.next_switch(at, heading) {
            Some(r) => r,
            None => {
                warn!("Vehicle {}: no switch ahead of {} heading {}", self.id(), at, heading);
                return;
            }
        };
        let position = self.track.grid.resolve_switch(found.pos, found.direction, departure);
        debug!("Vehicle {}: switch {} to {:?}", self.id(), found.pos, position);
        self.log(VehicleLogEvent::Switch(found.pos, position));
        if let Err(e) = self.actuator.set_switch(found.pos, position) {
            error!("Vehicle {}: setting switch {}: {}", self.id(), found.pos, e);
        }
    }

    /// Creeps off the sensor at `at`, stops, reverses and sets off again.
    pub fn turnaround(&mut self, at: Point) {
        self.log(VehicleLogEvent::TurnAround);
        let creep = if self.forwards { self.config.creep_speed } else { -self.config.creep_speed };
        self.set_velocity(creep);
        match self.events.next_event() {
            Ok(ev) if ev.pos == at && ev.status == SensorStatus::Inactive => {}
            Ok(ev) => warn!("Vehicle {} expected to leave {} but got {:?}", self.id(), at, ev),
            Err(e) => warn!("Vehicle {} turning around at {}: {}", self.id(), at, e),
        }
        self.stop();
        self.forwards = !self.forwards;
        thread::sleep(self.config.settle);
        self.go();
    }
}
