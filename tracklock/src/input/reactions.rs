use crate::input::trackmap::*;
use crate::railway::actions::Action;
use crate::railway::track::{Binding, Track};
use regex::Regex;

#[derive(Debug, Fail)]
pub enum ParseError {
    #[fail(display = "error in regular expression: {}", _0)]
    RegexError(String),
    #[fail(display = "line {}: error converting number", _0)]
    NumberError(usize),
    #[fail(display = "line {}: unknown direction \"{}\"", _0, _1)]
    UnknownDirection(usize, String),
    #[fail(display = "line {}: no sensor at {}", _0, _1)]
    UnknownSensor(usize, Point),
    #[fail(display = "line {}: position {} is outside the map", _0, _1)]
    OutOfBounds(usize, Point),
    #[fail(display = "line {}: {} is not plain track", _0, _1)]
    NotPlainTrack(usize, Point),
    #[fail(display = "line {}: unrecognized action: {}", _0, _1)]
    UnrecognizedAction(usize, String),
    #[fail(display = "line {}: unrecognized reaction: {}", _0, _1)]
    Unrecognized(usize, String),
}

fn regex(re: &str) -> Result<Regex, ParseError> {
    Regex::new(re).map_err(|e| ParseError::RegexError(format!("{:?}", e)))
}

struct ActionParser<'a> {
    track: &'a Track,
    cell_re: Regex,
    switch_re: Regex,
    later_re: Regex,
}

impl<'a> ActionParser<'a> {
    fn new(track: &'a Track) -> Result<ActionParser<'a>, ParseError> {
        Ok(ActionParser {
            track: track,
            cell_re: regex(r"^\s*(enter|acquire|leave)\s+(\d+)\s+(\d+)\s*$")?,
            switch_re: regex(r"^\s*switch\s+(\w+)\s*$")?,
            later_re: regex(r"^\s*later\s+(\d+)\s+(\d+)\s+(.+)$")?,
        })
    }

    fn point(&self, line: usize, x: &str, y: &str) -> Result<Point, ParseError> {
        let x = x.parse::<i32>().map_err(|_e| ParseError::NumberError(line))?;
        let y = y.parse::<i32>().map_err(|_e| ParseError::NumberError(line))?;
        Ok(Point::new(x, y))
    }

    fn sensor(&self, line: usize, x: &str, y: &str) -> Result<Point, ParseError> {
        let p = self.point(line, x, y)?;
        if !self.track.is_sensor(p) {
            return Err(ParseError::UnknownSensor(line, p));
        }
        Ok(p)
    }

    fn parse(&self, line: usize, text: &str) -> Result<Action, ParseError> {
        match text.trim() {
            "turnaround" => return Ok(Action::TurnAround),
            "stop" => return Ok(Action::Stop),
            "go" => return Ok(Action::Go),
            _ => {}
        }
        if let Some(groups) = self.cell_re.captures(text) {
            let p = self.point(line, &groups[2], &groups[3])?;
            if !self.track.grid.contains(p) {
                return Err(ParseError::OutOfBounds(line, p));
            }
            // Segment locks are only defined for cells with two exits.
            if self.track.grid.exits(p) != 2 {
                return Err(ParseError::NotPlainTrack(line, p));
            }
            return Ok(match &groups[1] {
                "enter" => Action::Enter(p),
                "acquire" => Action::Acquire(p),
                _ => Action::Leave(p),
            });
        }
        if let Some(groups) = self.switch_re.captures(text) {
            let dir = groups[1].parse::<Direction>()
                .map_err(|d| ParseError::UnknownDirection(line, d))?;
            return Ok(Action::Switch(dir));
        }
        if let Some(groups) = self.later_re.captures(text) {
            let p = self.sensor(line, &groups[1], &groups[2])?;
            let action = self.parse(line, &groups[3])?;
            return Ok(Action::Later(p, Box::new(action)));
        }
        Err(ParseError::UnrecognizedAction(line, text.trim().to_string()))
    }
}

/// Parses the reaction layout format
///
/// * `# comment`
/// * `on 2 1 east: enter 4 1; switch north`
/// * `on 0 1 west: stop; leave 4 1; later 0 1 go`
///
/// Actions: `enter X Y`, `acquire X Y`, `leave X Y`, `switch DIR`,
/// `turnaround`, `stop`, `go`, `later X Y ACTION`.
pub fn parse_reactions(input: &str, track: &Track) -> Result<Vec<Binding>, ParseError> {
    let on_re = regex(r"(?x) ^ \s* on \s+ (?P<x>\d+) \s+ (?P<y>\d+) \s+ (?P<dir>\w+) \s* :
            (?P<actions>.*) $")?;
    let actions = ActionParser::new(track)?;

    let mut bindings = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let n = i + 1;
        let line = match line.find('#') {
            Some(c) => &line[..c],
            None => line,
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Some(groups) = on_re.captures(line) {
            let sensor = actions.sensor(n, &groups["x"], &groups["y"])?;
            let heading = groups["dir"].parse::<Direction>()
                .map_err(|d| ParseError::UnknownDirection(n, d))?;
            let list = groups["actions"].split(';')
                .filter(|a| !a.trim().is_empty())
                .map(|a| actions.parse(n, a))
                .collect::<Result<Vec<_>, _>>()?;
            bindings.push(Binding { sensor: sensor, heading: heading, actions: list });
            continue;
        }
        return Err(ParseError::Unrecognized(n, line.trim().to_string()));
    }
    Ok(bindings)
}
