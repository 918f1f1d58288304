use super::trackmap::*;
use regex::Regex;
use smallvec::SmallVec;

/// Canonical boundary markers offset x by this stride per direction, so
/// maps must be narrower.
pub const MAX_WIDTH: i32 = 1000;
pub const MAX_HEIGHT: i32 = 1000;

#[derive(Debug, Fail)]
pub enum LoadError {
    #[fail(display = "error in regular expression: {}", _0)]
    RegexError(String),
    #[fail(display = "not a TrainLineFile 2 map")]
    NotTrainFile,
    #[fail(display = "line {}: expected map dimensions", _0)]
    Dimensions(usize),
    #[fail(display = "map is {} cells wide, must be less than {}", _0, _1)]
    TooWide(i32, i32),
    #[fail(display = "map is {} cells tall, must be less than {}", _0, _1)]
    TooTall(i32, i32),
    #[fail(display = "line {}: error converting number", _0)]
    NumberError(usize),
    #[fail(display = "line {}: record declares {} rails, found {}", line, expected, found)]
    RailCount { line: usize, expected: usize, found: usize },
    #[fail(display = "line {}: unknown rail \"{}\"", _0, _1)]
    UnknownRail(usize, String),
    #[fail(display = "line {}: position {} is outside the map", _0, _1)]
    OutOfBounds(usize, Point),
    #[fail(display = "line {}: unrecognized record: {}", _0, _1)]
    Unrecognized(usize, String),
}

fn regex(re: &str) -> Result<Regex, LoadError> {
    Regex::new(re).map_err(|e| LoadError::RegexError(format!("{:?}", e)))
}

fn number(line: usize, s: &str) -> Result<i32, LoadError> {
    s.parse::<i32>().map_err(|_e| LoadError::NumberError(line))
}

pub fn parse_rail(line: usize, token: &str) -> Result<Rail, LoadError> {
    match token {
        "HorizontalRail" => return Ok(Rail::Horizontal),
        "VerticalRail" => return Ok(Rail::Vertical),
        _ => {}
    }
    let dirs = Direction::ALL.iter()
        .filter(|d| token.contains(d.name()))
        .cloned()
        .collect::<SmallVec<[Direction; 4]>>();
    if dirs.is_empty() {
        return Err(LoadError::UnknownRail(line, token.to_string()));
    }
    Ok(Rail::Branch(dirs))
}

/// Parses the TrainLineFile 2 map format
///
/// * `TrainLineFile 2`
/// * `20 19` (width, height)
/// * `R 3 7 1 HorizontalRail Sensor`
/// * `R 4 7 2 HorizontalRail NorthWestRail`
/// * `T 1 7` (vehicle start, in vehicle order)
/// * `.`
///
/// Lines ending in `station` are ignored.
pub fn parse_trackmap(input: &str) -> Result<TrackMap, LoadError> {
    let dims_re = regex(r"^\s*(\d+)\s+(\d+)\s*$")?;
    let rail_re = regex(r"(?x) ^ \s* R \s+ (?P<x>\d+) \s+ (?P<y>\d+) \s+ (?P<n>\d+)
            (?P<rails>(\s+\w+)*) \s* $")?;
    let train_re = regex(r"^\s*T\s+(\d+)\s+(\d+)\s*$")?;

    let mut lines = input.lines().enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|&(_, l)| !l.is_empty());

    match lines.next() {
        Some((_, "TrainLineFile 2")) => {},
        _ => return Err(LoadError::NotTrainFile),
    }

    let (width, height) = match lines.next() {
        Some((n, line)) => match dims_re.captures(line) {
            Some(groups) => (number(n, &groups[1])?, number(n, &groups[2])?),
            None => return Err(LoadError::Dimensions(n)),
        },
        None => return Err(LoadError::Dimensions(1)),
    };
    if width >= MAX_WIDTH {
        return Err(LoadError::TooWide(width, MAX_WIDTH));
    }
    if height >= MAX_HEIGHT {
        return Err(LoadError::TooTall(height, MAX_HEIGHT));
    }

    let mut grid = Grid::new(width, height);
    let mut sensors = Vec::new();
    let mut starts = Vec::new();

    for (n, line) in lines {
        if line == "." {
            break;
        }
        if line.ends_with("station") {
            continue;
        }
        if let Some(groups) = rail_re.captures(line) {
            let p = Point::new(number(n, &groups["x"])?, number(n, &groups["y"])?);
            if !grid.contains(p) {
                return Err(LoadError::OutOfBounds(n, p));
            }
            let mut tokens = groups["rails"].split_whitespace().collect::<Vec<_>>();
            let is_sensor = tokens.last() == Some(&"Sensor");
            if is_sensor {
                tokens.pop();
            }
            let expected = number(n, &groups["n"])? as usize;
            if tokens.len() != expected {
                return Err(LoadError::RailCount { line: n, expected: expected, found: tokens.len() });
            }
            for token in tokens {
                let rail = parse_rail(n, token)?;
                grid.add_rail(p, &rail);
            }
            if is_sensor {
                sensors.push(p);
            }
            continue;
        }
        if let Some(groups) = train_re.captures(line) {
            let p = Point::new(number(n, &groups[1])?, number(n, &groups[2])?);
            if !grid.contains(p) {
                return Err(LoadError::OutOfBounds(n, p));
            }
            starts.push(p);
            continue;
        }
        return Err(LoadError::Unrecognized(n, line.to_string()));
    }

    Ok(TrackMap { grid: grid, sensors: sensors, starts: starts })
}
