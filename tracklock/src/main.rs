use log::{info, warn};
use std::collections::HashMap;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use structopt::StructOpt;
use tracklock::*;
use tracklock::link::{Actuator, VehicleId};
use tracklock::output::history::{format_events, VehicleLogEvent};
use tracklock::railway::locks::LockRegistry;
use tracklock::railway::track::Track;
use tracklock::railway::vehicle::{Vehicle, VehicleConfig};

/// Tracklock -- sensor driven control of vehicles sharing a rail network.
///
/// Talks to the simulator over stdin/stdout, logs to stderr.
#[derive(StructOpt, Debug)]
#[structopt(name = "tracklock")]
struct Opt {
    /// Verbose mode (-v, -vv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Track map in the TrainLineFile 2 format
    #[structopt(parse(from_os_str))]
    map: PathBuf,

    /// Sensor reactions in the reaction layout format
    #[structopt(short = "r", long = "reactions", parse(from_os_str))]
    reactions: Option<PathBuf>,

    /// Maximum speed of each vehicle, in vehicle order (default 15)
    #[structopt(short = "s", long = "speed")]
    speeds: Vec<i32>,

    /// Pause between stopping and reversing in a turnaround
    #[structopt(long = "settle-ms", default_value = "1000")]
    settle_ms: u64,

    /// Print the track as ASCII and exit
    #[structopt(short = "p", long = "print-map")]
    print_map: bool,

    /// Output vehicle event history to file
    #[structopt(short = "H", long = "history", parse(from_os_str))]
    history: Option<PathBuf>,
}

type EventLog = Arc<Mutex<Vec<(VehicleId, VehicleLogEvent)>>>;

fn run(opt: &Opt) -> AppResult<()> {
    let map = get_trackmap(&opt.map)?;
    if opt.print_map {
        print!("{}", output::ascii::ascii_map(&map.grid));
        return Ok(());
    }

    let mut track = Track::new(map);
    if let Some(ref reactions) = opt.reactions {
        let bindings = get_reactions(reactions, &track)?;
        info!("{} reactions", bindings.len());
        for b in track.bind_scripts(bindings) {
            warn!("No sensor at {}, reaction dropped", b.sensor);
        }
    }
    let track = Arc::new(track);
    let n = track.num_vehicles();
    info!("{} vehicles", n);

    let (sim, events) = link::tsim::connect(BufReader::new(io::stdin()), io::stdout(), n)?;
    let actuator: Arc<dyn Actuator> = Arc::new(sim);
    let registry = Arc::new(LockRegistry::new());
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for (i, rx) in events.into_iter().enumerate() {
        let id = i + 1;
        let mut config = VehicleConfig::new(id);
        if let Some(&speed) = opt.speeds.get(i) {
            config.max_speed = speed;
        }
        config.settle = Duration::from_millis(opt.settle_ms);
        let mut vehicle = Vehicle::new(config, track.clone(), registry.clone(), actuator.clone(), Box::new(rx))?;
        if opt.history.is_some() {
            let log = log.clone();
            vehicle = vehicle.with_logger(Box::new(move |e: VehicleLogEvent| {
                log.lock().unwrap_or_else(PoisonError::into_inner).push((id, e))
            }));
        }
        handles.push(spawn_vehicle(vehicle)?);
    }
    let result = join_vehicles(handles);

    if let Some(ref history) = opt.history {
        use std::fs::File;
        let mut per_vehicle: HashMap<VehicleId, Vec<VehicleLogEvent>> = HashMap::new();
        for (id, e) in log.lock().unwrap_or_else(PoisonError::into_inner).drain(..) {
            per_vehicle.entry(id).or_insert_with(Vec::new).push(e);
        }
        let mut file = File::create(history)?;
        for id in 1..n + 1 {
            if let Some(events) = per_vehicle.get(&id) {
                write!(file, "{}", format_events(id, events))?;
            }
        }
    }
    result
}

pub fn main() {
    let opt = Opt::from_args();
    let level = match opt.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    info!("{:?}", opt);
    match run(&opt) {
        Ok(()) => {},
        Err(e) => {
            eprintln!("Error:\n{}", e.as_fail());
            std::process::exit(1);
        },
    }
}
