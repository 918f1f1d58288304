use crate::*;
use crate::input::trackmap::*;
use crate::input::trackmap_parser::parse_trackmap;
use crate::link::{Actuator, CommandError, SensorEvent, SensorStatus, VehicleId};
use crate::output::history::VehicleLogEvent;
use crate::railway::locks::LockRegistry;
use crate::railway::switches::SwitchPosition;
use crate::railway::track::{Binding, Track};
use crate::railway::vehicle::{Vehicle, VehicleConfig};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Three cells, sensors at both ends, one vehicle in the middle.
pub const STRAIGHT: &str = "TrainLineFile 2\n3 1\n\
                            R 0 0 1 HorizontalRail Sensor\n\
                            R 1 0 1 HorizontalRail\n\
                            R 2 0 1 HorizontalRail Sensor\n\
                            T 1 0\n.\n";

/// Main line along y = 1 with a passing loop over the top between the
/// switches at (3,1) and (5,1).
///
/// ```text
///    +S+
/// S-S<->S--
/// ```
pub const SIDING: &str = "TrainLineFile 2\n9 2\n\
                          R 0 1 1 HorizontalRail Sensor\n\
                          R 1 1 1 HorizontalRail\n\
                          R 2 1 1 HorizontalRail Sensor\n\
                          R 3 1 2 HorizontalRail NorthWestRail\n\
                          R 3 0 1 SouthEastRail\n\
                          R 4 0 1 HorizontalRail Sensor\n\
                          R 5 0 1 SouthWestRail\n\
                          R 4 1 1 HorizontalRail\n\
                          R 5 1 2 HorizontalRail NorthEastRail\n\
                          R 6 1 1 HorizontalRail Sensor\n\
                          R 7 1 1 HorizontalRail\n\
                          R 8 1 1 HorizontalRail\n\
                          T 1 1\n\
                          T 7 1\n.\n";

pub fn siding() -> Track {
    Track::new(parse_trackmap(SIDING).unwrap())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Speed(VehicleId, i32),
    Switch(Point, SwitchPosition),
}

/// Accepts every command and remembers it.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    commands: Mutex<Vec<Command>>,
}

impl RecordingActuator {
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn speeds(&self, vehicle: VehicleId) -> Vec<i32> {
        self.commands().into_iter().filter_map(|c| match c {
            Command::Speed(v, s) if v == vehicle => Some(s),
            _ => None,
        }).collect()
    }

    pub fn switches(&self) -> Vec<(Point, SwitchPosition)> {
        self.commands().into_iter().filter_map(|c| match c {
            Command::Switch(p, s) => Some((p, s)),
            _ => None,
        }).collect()
    }
}

impl Actuator for RecordingActuator {
    fn set_speed(&self, vehicle: VehicleId, speed: i32) -> Result<(), CommandError> {
        self.commands.lock().unwrap().push(Command::Speed(vehicle, speed));
        Ok(())
    }

    fn set_switch(&self, pos: Point, position: SwitchPosition) -> Result<(), CommandError> {
        self.commands.lock().unwrap().push(Command::Switch(pos, position));
        Ok(())
    }
}

fn wait_until<F: Fn() -> bool>(what: &str, f: F) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !f() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn active(vehicle: VehicleId, x: i32, y: i32) -> SensorEvent {
    SensorEvent { vehicle: vehicle, pos: Point::new(x, y), status: SensorStatus::Active }
}

struct Fleet {
    registry: Arc<LockRegistry>,
    actuator: Arc<RecordingActuator>,
    senders: Vec<Sender<SensorEvent>>,
    handles: Vec<VehicleHandle>,
    log: Arc<Mutex<Vec<(VehicleId, VehicleLogEvent)>>>,
}

fn start_fleet(track: Track) -> Fleet {
    let track = Arc::new(track);
    let registry = Arc::new(LockRegistry::new());
    let actuator = Arc::new(RecordingActuator::default());
    let log: Arc<Mutex<Vec<(VehicleId, VehicleLogEvent)>>> = Arc::new(Mutex::new(Vec::new()));
    let mut senders = Vec::new();
    let mut handles = Vec::new();
    for id in 1..track.num_vehicles() + 1 {
        let (tx, rx) = channel();
        let log = log.clone();
        let v = Vehicle::new(VehicleConfig::new(id), track.clone(), registry.clone(),
                             actuator.clone(), Box::new(rx)).unwrap()
            .with_logger(Box::new(move |e: VehicleLogEvent| log.lock().unwrap().push((id, e))));
        senders.push(tx);
        handles.push(spawn_vehicle(v).unwrap());
    }
    Fleet { registry: registry, actuator: actuator, senders: senders, handles: handles, log: log }
}

impl Fleet {
    fn finish(self) -> Vec<(VehicleId, VehicleLogEvent)> {
        drop(self.senders);
        join_vehicles(self.handles).unwrap();
        let log = self.log.lock().unwrap().clone();
        log
    }
}

#[test]
fn headings_on_a_straight_line() {
    let fleet = start_fleet(Track::new(parse_trackmap(STRAIGHT).unwrap()));
    let tx = &fleet.senders[0];
    tx.send(active(1, 2, 0)).unwrap();
    tx.send(SensorEvent { status: SensorStatus::Inactive, ..active(1, 2, 0) }).unwrap();
    tx.send(active(1, 0, 0)).unwrap();
    tx.send(active(1, 2, 0)).unwrap();
    let log = fleet.finish();
    let headings = log.into_iter().filter_map(|(_, e)| match e {
        VehicleLogEvent::Heading(_, d) => Some(d),
        _ => None,
    }).collect::<Vec<_>>();
    assert_eq!(headings, vec![Direction::East, Direction::West, Direction::East]);
}

#[test]
fn waiting_for_a_taken_segment() {
    use maplit::*;

    let mut track = siding();
    let bindings = input::reactions::parse_reactions("\
        on 2 1 east: enter 4 1\n\
        on 6 1 west: enter 4 1\n\
        on 6 1 east: stop; leave 4 1\n", &track).unwrap();
    assert!(track.bind_scripts(bindings).is_empty());
    let (west, middle, east) = (track.segment_key(Point::new(1, 1)),
                                track.segment_key(Point::new(4, 1)),
                                track.segment_key(Point::new(7, 1)));

    let fleet = start_fleet(track);
    let registry = fleet.registry.clone();
    let actuator = fleet.actuator.clone();
    wait_until("both vehicles to set off", || actuator.commands().len() == 2);

    fleet.senders[0].send(active(1, 2, 1)).unwrap();
    wait_until("vehicle 1 to enter the middle", || registry.held().contains(&(middle, 1)));

    fleet.senders[1].send(active(2, 6, 1)).unwrap();
    wait_until("vehicle 2 to stop", || actuator.speeds(2) == vec![15, 0]);
    assert_eq!(registry.held().iter().filter(|&&(k, _)| k == middle).count(), 1);

    fleet.senders[0].send(active(1, 6, 1)).unwrap();
    wait_until("vehicle 2 to set off again", || actuator.speeds(2) == vec![15, 0, 15]);

    let commands = actuator.commands();
    let position = |c: &Command| commands.iter().position(|x| x == c).unwrap();
    let v2_stop = position(&Command::Speed(2, 0));
    let v1_stop = position(&Command::Speed(1, 0));
    let v2_resume = commands.iter().rposition(|x| *x == Command::Speed(2, 15)).unwrap();
    assert!(v2_stop < v1_stop);
    assert!(v1_stop < v2_resume);

    let held = registry.held().into_iter().collect::<std::collections::HashMap<_, _>>();
    assert_eq!(held, hashmap!{ west => 1, middle => 2, east => 2 });
    fleet.finish();
}

#[test]
fn scripts_for_the_same_sensor_are_joined() {
    use crate::railway::actions::Action;

    let mut track = siding();
    let s = Point::new(2, 1);
    let unbound = track.bind_scripts(vec![
        Binding { sensor: s, heading: Direction::East, actions: vec![Action::Stop] },
        Binding { sensor: Point::new(1, 1), heading: Direction::East, actions: vec![Action::Go] },
        Binding { sensor: s, heading: Direction::East, actions: vec![Action::TurnAround] },
        Binding { sensor: s, heading: Direction::West, actions: vec![Action::Go] },
    ]);
    assert_eq!(unbound.len(), 1);
    assert_eq!(unbound[0].sensor, Point::new(1, 1));
    assert_eq!(format!("{:?}", track.reaction(s, Direction::East).unwrap()),
               "Script([Stop, TurnAround])");
    assert_eq!(format!("{:?}", track.reaction(s, Direction::West).unwrap()), "Script([Go])");
    assert!(track.reaction(s, Direction::North).is_none());
}

#[test]
fn loaders_report_errors() {
    assert!(get_trackmap_string(SIDING).is_ok());
    let e = get_trackmap_string("TrainLineFile 2\n2000 1\n").unwrap_err();
    assert_eq!(e.to_string(), "map is 2000 cells wide, must be less than 1000");
    let e = get_trackmap_string("TrainLineFile 2\n3 2000000000\n.\n").unwrap_err();
    assert_eq!(e.to_string(), "map is 2000000000 cells tall, must be less than 1000");
}
