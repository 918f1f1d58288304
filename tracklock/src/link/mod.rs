//! Boundary to the physical (or simulated) railway: commands out, sensor
//! events in.

pub mod tsim;

use crate::input::trackmap::Point;
use crate::railway::switches::SwitchPosition;
use std::sync::mpsc::Receiver;

/// Vehicles are numbered from 1, in the order of the map's start records.
pub type VehicleId = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SensorStatus {
    Active,
    Inactive,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SensorEvent {
    pub vehicle: VehicleId,
    pub pos: Point,
    pub status: SensorStatus,
}

#[derive(Debug, Fail)]
pub enum CommandError {
    #[fail(display = "command rejected: {}", _0)]
    Rejected(String),
    #[fail(display = "link closed")]
    Closed,
}

#[derive(Debug, Fail)]
pub enum WaitError {
    #[fail(display = "wait interrupted: {}", _0)]
    Interrupted(String),
    #[fail(display = "event source closed")]
    Closed,
}

/// Outbound commands. Shared by all vehicle threads.
pub trait Actuator: Send + Sync {
    fn set_speed(&self, vehicle: VehicleId, speed: i32) -> Result<(), CommandError>;
    fn set_switch(&self, pos: Point, position: SwitchPosition) -> Result<(), CommandError>;
}

/// Blocking pull of the next sensor event of one vehicle.
pub trait EventSource: Send {
    fn next_event(&mut self) -> Result<SensorEvent, WaitError>;
}

impl EventSource for Receiver<SensorEvent> {
    fn next_event(&mut self) -> Result<SensorEvent, WaitError> {
        self.recv().map_err(|_| WaitError::Closed)
    }
}
