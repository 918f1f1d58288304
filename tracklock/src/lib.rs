#[macro_use] extern crate failure_derive;

pub mod input;
pub mod link;
pub mod output;
pub mod railway;

#[cfg(test)]
mod tests;

use crate::input::trackmap::TrackMap;
use crate::railway::track::{Binding, Track};
use crate::railway::vehicle::{ControlError, Vehicle};
use log::error;
use std::path::Path;
use std::thread::{self, JoinHandle};

pub type AppResult<T> = Result<T, failure::Error>;

pub fn read_file(f: &Path) -> AppResult<String> {
    use std::fs::File;
    use std::io::prelude::*;
    use std::io::BufReader;

    let file = File::open(f)?;
    let mut file = BufReader::new(&file);
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

pub fn get_trackmap(s: &Path) -> AppResult<TrackMap> {
    let contents = read_file(s)?;
    get_trackmap_string(&contents)
}

pub fn get_trackmap_string(s: &str) -> AppResult<TrackMap> {
    let map = input::trackmap_parser::parse_trackmap(s)?;
    Ok(map)
}

pub fn get_reactions(s: &Path, track: &Track) -> AppResult<Vec<Binding>> {
    let contents = read_file(s)?;
    let b = input::reactions::parse_reactions(&contents, track)?;
    Ok(b)
}

pub type VehicleHandle = JoinHandle<Result<(), ControlError>>;

pub fn spawn_vehicle(vehicle: Vehicle) -> AppResult<VehicleHandle> {
    let name = format!("vehicle-{}", vehicle.id());
    let handle = thread::Builder::new().name(name).spawn(move || vehicle.run())?;
    Ok(handle)
}

/// Waits for every vehicle thread. All are joined even if some fail; the
/// first failure is returned.
pub fn join_vehicles(handles: Vec<VehicleHandle>) -> AppResult<()> {
    let mut first_error = None;
    for h in handles {
        let err = match h.join() {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => failure::Error::from(e),
            Err(_) => failure::err_msg("vehicle thread panicked"),
        };
        error!("{}", err);
        if first_error.is_none() {
            first_error = Some(err);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
