use crate::input::trackmap::{Direction, Point};
use crate::railway::locks::LockKey;
use crate::railway::switches::SwitchPosition;

#[derive(Debug, Clone, PartialEq)]
pub enum VehicleLogEvent {
    Heading(Point, Direction), // sensor triggered, inferred heading
    Speed(i32),
    Acquired(LockKey),
    Released(LockKey),
    Switch(Point, SwitchPosition),
    TurnAround,
}

pub type VehicleLogger = Box<dyn Fn(VehicleLogEvent) + Send>;

/// One event per line: `vehicle event`.
pub fn format_events(vehicle: usize, events: &[VehicleLogEvent]) -> String {
    use std::fmt::Write;
    let mut s = String::new();
    for ev in events {
        use self::VehicleLogEvent::*;
        let _ = match *ev {
            Heading(p, d) => writeln!(s, "{} sensor {} heading {}", vehicle, p, d),
            Speed(v) => writeln!(s, "{} speed {}", vehicle, v),
            Acquired(k) => writeln!(s, "{} acquired {}", vehicle, k),
            Released(k) => writeln!(s, "{} released {}", vehicle, k),
            Switch(p, pos) => writeln!(s, "{} switch {} {:?}", vehicle, p, pos),
            TurnAround => writeln!(s, "{} turnaround", vehicle),
        };
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_per_event() {
        let s = format_events(2, &[
            VehicleLogEvent::Speed(15),
            VehicleLogEvent::Heading(Point::new(0, 1), Direction::West),
            VehicleLogEvent::Acquired(LockKey::Loop(Point::new(0, 0))),
        ]);
        assert_eq!(s, "2 speed 15\n2 sensor (0, 1) heading West\n2 acquired loop (0, 0)\n");
    }
}
