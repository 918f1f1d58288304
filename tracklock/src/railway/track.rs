use crate::input::trackmap::*;
use super::actions::{Action, Reaction, Script};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// A sensor and the reactions bound to it, one per heading at most.
#[derive(Debug)]
pub struct Sensor {
    pub pos: Point,
    reactions: SmallVec<[(Direction, Arc<dyn Reaction>); 2]>,
}

impl Sensor {
    pub fn new(pos: Point) -> Sensor {
        Sensor { pos: pos, reactions: SmallVec::new() }
    }

    pub fn bind(&mut self, heading: Direction, reaction: Arc<dyn Reaction>) {
        self.reactions.retain(|&mut (d, _)| d != heading);
        self.reactions.push((heading, reaction));
    }

    pub fn reaction(&self, heading: Direction) -> Option<&Arc<dyn Reaction>> {
        self.reactions.iter().find(|&&(d, _)| d == heading).map(|&(_, ref r)| r)
    }
}

/// Reaction script bound to a sensor for vehicles passing with `heading`.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub sensor: Point,
    pub heading: Direction,
    pub actions: Vec<Action>,
}

/// The static world every vehicle shares: the grid and the sensors on it.
/// Read only once the vehicles are running.
#[derive(Debug)]
pub struct Track {
    pub grid: Grid,
    sensors: HashMap<Point, Sensor>,
    starts: Vec<Point>,
}

impl Track {
    pub fn new(map: TrackMap) -> Track {
        let sensors = map.sensors.iter().map(|&p| (p, Sensor::new(p))).collect();
        Track { grid: map.grid, sensors: sensors, starts: map.starts }
    }

    pub fn is_sensor(&self, p: Point) -> bool {
        self.sensors.contains_key(&p)
    }

    pub fn sensor(&self, p: Point) -> Option<&Sensor> {
        self.sensors.get(&p)
    }

    pub fn sensor_mut(&mut self, p: Point) -> Option<&mut Sensor> {
        self.sensors.get_mut(&p)
    }

    pub fn reaction(&self, p: Point, heading: Direction) -> Option<&Arc<dyn Reaction>> {
        self.sensor(p).and_then(|s| s.reaction(heading))
    }

    pub fn num_vehicles(&self) -> usize {
        self.starts.len()
    }

    /// Vehicles are numbered from 1.
    pub fn start_position(&self, vehicle: usize) -> Option<Point> {
        if vehicle == 0 { return None; }
        self.starts.get(vehicle - 1).cloned()
    }

    /// Binds action scripts to sensors. Bindings for the same sensor and
    /// heading are joined in order. Bindings for unknown sensors are
    /// returned unbound.
    pub fn bind_scripts(&mut self, bindings: Vec<Binding>) -> Vec<Binding> {
        let mut scripts: HashMap<(Point, Direction), Vec<Action>> = HashMap::new();
        let mut order = Vec::new();
        let mut unbound = Vec::new();
        for b in bindings {
            if !self.is_sensor(b.sensor) {
                unbound.push(b);
                continue;
            }
            let key = (b.sensor, b.heading);
            if !scripts.contains_key(&key) {
                order.push(key);
            }
            scripts.entry(key).or_insert_with(Vec::new).extend(b.actions);
        }
        for key in order {
            if let (Some(actions), Some(sensor)) = (scripts.remove(&key), self.sensor_mut(key.0)) {
                sensor.bind(key.1, Arc::new(Script(actions)));
            }
        }
        unbound
    }
}
