use crate::input::trackmap::*;
use super::vehicle::{ControlError, Vehicle};
use std::fmt;

/// Primitive step of a sensor reaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Take the segment holding the cell, stopping to wait if it is taken.
    Enter(Point),
    /// Take the segment holding the cell, blocking without stopping.
    Acquire(Point),
    Leave(Point),
    /// Set the next switch ahead so the vehicle leaves it with this heading.
    Switch(Direction),
    TurnAround,
    Stop,
    Go,
    /// Run the action once, the next time the vehicle triggers the sensor.
    Later(Point, Box<Action>),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Action::Enter(p) => write!(f, "enter {} {}", p.x, p.y),
            Action::Acquire(p) => write!(f, "acquire {} {}", p.x, p.y),
            Action::Leave(p) => write!(f, "leave {} {}", p.x, p.y),
            Action::Switch(d) => write!(f, "switch {}", d.name().to_lowercase()),
            Action::TurnAround => write!(f, "turnaround"),
            Action::Stop => write!(f, "stop"),
            Action::Go => write!(f, "go"),
            Action::Later(p, ref a) => write!(f, "later {} {} {}", p.x, p.y, a),
        }
    }
}

/// Behaviour bound to a sensor for one heading. Runs on the thread of the
/// vehicle that triggered the sensor.
pub trait Reaction: Send + Sync + fmt::Debug {
    fn react(&self, vehicle: &mut Vehicle, at: Point, heading: Direction) -> Result<(), ControlError>;
}

/// Actions performed in order.
#[derive(Clone, Debug, PartialEq)]
pub struct Script(pub Vec<Action>);

impl Reaction for Script {
    fn react(&self, vehicle: &mut Vehicle, at: Point, heading: Direction) -> Result<(), ControlError> {
        for action in &self.0 {
            vehicle.perform(action, at, heading)?;
        }
        Ok(())
    }
}
