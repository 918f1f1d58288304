//! Line protocol towards the train simulator.
//!
//! Commands, one per line, each answered by `Ok` or `Error <message>`:
//!
//! * `SetSpeed 1 -15`
//! * `SetSwitch 3 1 left`
//!
//! Sensor reports arrive unsolicited between replies:
//!
//! * `Sensor 1 4 7 active`

use crate::input::trackmap::Point;
use crate::railway::locks::guard;
use crate::railway::switches::SwitchPosition;
use super::*;
use log::{debug, error, warn};
use regex::Regex;
use std::io::{BufRead, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::thread;

#[derive(Debug, PartialEq)]
enum Reply {
    Ok,
    Error(String),
}

#[derive(Debug, PartialEq)]
enum Incoming {
    Reply(Reply),
    Sensor(SensorEvent),
}

struct LineParser {
    sensor_re: Regex,
    error_re: Regex,
}

impl LineParser {
    fn new() -> Result<LineParser, regex::Error> {
        Ok(LineParser {
            sensor_re: Regex::new(r"(?x) ^ \s* Sensor \s+ (?P<id>\d+) \s+ (?P<x>\d+) \s+ (?P<y>\d+) \s+
                    (?P<status>active|inactive) \s* $")?,
            error_re: Regex::new(r"^\s*Error\s*(.*)$")?,
        })
    }

    fn parse(&self, line: &str) -> Option<Incoming> {
        if line.trim() == "Ok" {
            return Some(Incoming::Reply(Reply::Ok));
        }
        if let Some(groups) = self.error_re.captures(line) {
            return Some(Incoming::Reply(Reply::Error(groups[1].trim().to_string())));
        }
        let groups = self.sensor_re.captures(line)?;
        Some(Incoming::Sensor(SensorEvent {
            vehicle: groups["id"].parse().ok()?,
            pos: Point::new(groups["x"].parse().ok()?, groups["y"].parse().ok()?),
            status: if &groups["status"] == "active" { SensorStatus::Active } else { SensorStatus::Inactive },
        }))
    }
}

struct Commands<W> {
    writer: W,
    replies: Receiver<Reply>,
}

/// Actuator talking to the simulator. One command is in flight at a time
/// so replies pair up with commands in order.
pub struct SimulatorLink<W> {
    commands: Mutex<Commands<W>>,
}

/// Starts the reader thread and returns the link together with one event
/// receiver per vehicle (vehicle N at index N - 1). When the reader hits
/// the end of its input, every receiver and the link report closed.
pub fn connect<R, W>(reader: R, writer: W, vehicles: usize)
    -> Result<(SimulatorLink<W>, Vec<Receiver<SensorEvent>>), failure::Error>
    where R: BufRead + Send + 'static, W: Write + Send
{
    let parser = LineParser::new()?;
    let (reply_tx, reply_rx) = channel();
    let (event_txs, event_rxs): (Vec<Sender<SensorEvent>>, Vec<Receiver<SensorEvent>>) =
        (0..vehicles).map(|_| channel()).unzip();

    thread::Builder::new().name("tsim-reader".to_string()).spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("Reading from simulator: {}", e);
                    break;
                }
            };
            match parser.parse(&line) {
                Some(Incoming::Reply(r)) => {
                    if reply_tx.send(r).is_err() {
                        debug!("Reply after the link was dropped");
                    }
                }
                Some(Incoming::Sensor(ev)) => {
                    let tx = if ev.vehicle > 0 { event_txs.get(ev.vehicle - 1) } else { None };
                    match tx {
                        Some(tx) => if tx.send(ev).is_err() {
                            debug!("Vehicle {} no longer listening", ev.vehicle);
                        },
                        None => warn!("Sensor event for unknown vehicle {}", ev.vehicle),
                    }
                }
                None => warn!("Unrecognized line from simulator: {:?}", line),
            }
        }
        debug!("Simulator input closed");
    })?;

    let link = SimulatorLink { commands: Mutex::new(Commands { writer: writer, replies: reply_rx }) };
    Ok((link, event_rxs))
}

impl<W: Write> SimulatorLink<W> {
    fn command(&self, line: String) -> Result<(), CommandError> {
        let mut c = guard(&self.commands);
        debug!("> {}", line);
        writeln!(c.writer, "{}", line)
            .and_then(|_| c.writer.flush())
            .map_err(|e| {
                error!("Writing to simulator: {}", e);
                CommandError::Closed
            })?;
        match c.replies.recv() {
            Ok(Reply::Ok) => Ok(()),
            Ok(Reply::Error(msg)) => Err(CommandError::Rejected(msg)),
            Err(_) => Err(CommandError::Closed),
        }
    }
}

impl<W: Write + Send> Actuator for SimulatorLink<W> {
    fn set_speed(&self, vehicle: VehicleId, speed: i32) -> Result<(), CommandError> {
        self.command(format!("SetSpeed {} {}", vehicle, speed))
    }

    fn set_switch(&self, pos: Point, position: SwitchPosition) -> Result<(), CommandError> {
        let position = match position {
            SwitchPosition::Left => "left",
            SwitchPosition::Right => "right",
        };
        self.command(format!("SetSwitch {} {} {}", pos.x, pos.y, position))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};
    use std::sync::Arc;
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn parses_lines() {
        let p = LineParser::new().unwrap();
        assert_eq!(p.parse("Ok"), Some(Incoming::Reply(Reply::Ok)));
        assert_eq!(p.parse("Error no such switch"),
                   Some(Incoming::Reply(Reply::Error("no such switch".to_string()))));
        assert_eq!(p.parse("Sensor 2 4 7 inactive"), Some(Incoming::Sensor(SensorEvent {
            vehicle: 2, pos: Point::new(4, 7), status: SensorStatus::Inactive,
        })));
        assert_eq!(p.parse("Sensor 2 4 seven active"), None);
        assert_eq!(p.parse("Hello"), None);
    }

    #[test]
    fn commands_and_events() {
        let input = "Ok\nError no switch at 9 9\nSensor 1 0 1 active\nnoise\nSensor 2 6 1 inactive\nSensor 5 0 0 active\n";
        let out = SharedBuffer::default();
        let (link, events) = connect(Cursor::new(input.as_bytes().to_vec()), out.clone(), 2).unwrap();
        assert_eq!(events.len(), 2);

        assert!(link.set_speed(1, -15).is_ok());
        match link.set_switch(Point::new(9, 9), SwitchPosition::Left) {
            Err(CommandError::Rejected(ref msg)) if msg == "no switch at 9 9" => {},
            x => panic!("unexpected {:?}", x),
        }
        // Input exhausted: no more replies will come.
        match link.set_speed(2, 0) {
            Err(CommandError::Closed) => {},
            x => panic!("unexpected {:?}", x),
        }
        assert_eq!(out.text(), "SetSpeed 1 -15\nSetSwitch 9 9 left\nSetSpeed 2 0\n");

        let mut rxs = events.into_iter();
        let mut v1 = rxs.next().unwrap();
        let mut v2 = rxs.next().unwrap();
        assert_eq!(v1.next_event().unwrap(),
                   SensorEvent { vehicle: 1, pos: Point::new(0, 1), status: SensorStatus::Active });
        match v1.next_event() {
            Err(WaitError::Closed) => {},
            x => panic!("unexpected {:?}", x),
        }
        assert_eq!(v2.next_event().unwrap().status, SensorStatus::Inactive);
    }
}
