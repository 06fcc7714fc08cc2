//! Spatial engine demo.
//!
//! Runs one session headless against simulated devices: a recording drawing
//! surface, an in-memory frame queue, a fake camera, a fake native AR bridge
//! (AR mode) and a threaded walking location source. The simulated user
//! walks straight ahead through a freshly spawned batch of coins; collections,
//! milestones and the final summary are logged.
//!
//! # Running
//!
//! ```sh
//! cargo run -- --mode ar --coins 10 --frames 600
//! RUST_LOG=debug cargo run -- --mode map --dump-frame last_frame.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{info, warn};

use spatialengine::components::geoposition::GeoPoint;
use spatialengine::components::marker::MarkerSpec;
use spatialengine::components::route::Route;
use spatialengine::components::screenposition::ScreenSize;
use spatialengine::components::worldposition::WorldPoint;
use spatialengine::events::session::SessionEvent;
use spatialengine::renderloop::FrameQueue;
use spatialengine::reporting::{LocalSummaryLog, SessionReporter};
use spatialengine::resources::engineconfig::EngineConfig;
use spatialengine::resources::sessionstate::SessionStates;
use spatialengine::resources::surface::{Color, RecordingSurface};
use spatialengine::session::{Session, SessionHost, SessionOptions};
use spatialengine::sim::{FakeBridge, FakeCamera, Walk, WalkSource};

/// Walking speed of the simulated user, metres per second.
const WALK_SPEED: f32 = 1.4;
/// Portrait phone screen.
const SCREEN: ScreenSize = ScreenSize {
    width: 390.0,
    height: 844.0,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Camera view with world-space coins.
    Ar,
    /// Flat map with geo-space coins, markers and a route.
    Map,
}

#[derive(Parser)]
#[command(
    version,
    about = "Headless spatial engine demo: walks a simulated user through a session."
)]
struct Cli {
    /// Engine configuration file.
    #[arg(long, value_name = "PATH", default_value = "./config.ini")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Ar)]
    mode: Mode,

    /// Coins to spawn; defaults to the configured spawn count.
    #[arg(long)]
    coins: Option<u32>,

    /// Frames to run before stopping.
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Simulated display refresh rate.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Write the display list of the last frame as JSON.
    #[arg(long, value_name = "PATH")]
    dump_frame: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if !(cli.fps > 0.0 && cli.fps.is_finite()) {
        eprintln!("Error: --fps must be a positive number");
        std::process::exit(2);
    }

    let mut config = EngineConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("{}; using defaults", e);
    }
    if let Some(coins) = cli.coins {
        config.spawn.count = coins;
    }
    let pattern = config.spawn;
    let start = config.fallback_location;
    let frame_time = Duration::from_secs_f64(1.0 / cli.fps);

    let surface = RecordingSurface::new(SCREEN);
    let frames = FrameQueue::new();
    let bridge = FakeBridge::supported();
    let reporter = SessionReporter::spawn(None, LocalSummaryLog::new(config.local_log.clone()));
    let walker = WalkSource::new(
        Walk::Geo {
            start,
            north: f64::from(WALK_SPEED) * frame_time.as_secs_f64(),
            east: 0.0,
        },
        frame_time,
    );

    let mut host = SessionHost::new(surface.clone(), frames.clone())
        .with_location_source(walker)
        .with_reporter(reporter);
    let options = match cli.mode {
        Mode::Ar => {
            host = host.with_camera(FakeCamera::new()).with_bridge(bridge.clone());
            SessionOptions::ar()
        }
        Mode::Map => SessionOptions::map(),
    };

    let mut session = Session::new(config, host);
    session.subscribe(|event| match event {
        SessionEvent::Collected { collectible, total } => {
            info!("Collected {} (total {})", collectible.id, total)
        }
        SessionEvent::Milestone { count } => info!("Milestone reached at {} coins", count),
        SessionEvent::Advisory { advisory } => warn!("{}", advisory.message()),
        _ => {}
    });

    if let Err(e) = session.initialize(options) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let spawned = match cli.mode {
        Mode::Ar => session.spawn_pattern(&pattern),
        Mode::Map => {
            let locations: Vec<GeoPoint> = (1..=pattern.count)
                .map(|i| offset_north(start, f64::from(pattern.spacing) * f64::from(i)))
                .collect();
            let end = offset_north(start, f64::from(pattern.spacing) * f64::from(pattern.count + 1));
            session
                .upsert_route(Route::geo("walk", vec![start, end], 4.0, Color::rgb(0x3b, 0x82, 0xf6)))
                .and_then(|()| session.add_marker(MarkerSpec::new("finish", end).with_title("Finish")))
                .and_then(|()| session.spawn_geo_collectibles(&locations))
        }
    };
    match spawned {
        Ok(coins) => info!("{} coins on the course", coins.len()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    for n in 0..cli.frames {
        if session.state() == SessionStates::Paused {
            // Stand-in for the quiz overlay being dismissed.
            if let Err(e) = session.resume() {
                warn!("Resume failed: {}", e);
                break;
            }
        }
        let Some(token) = frames.pop() else {
            break;
        };
        let now = f64::from(n) / cli.fps;
        if cli.mode == Mode::Ar {
            let z = -WALK_SPEED * now as f32;
            bridge.emit_frame(WorldPoint::new(0.0, 0.0, z), (now * 1000.0) as u64);
        }
        session.run_frame(token, now);
        std::thread::sleep(frame_time);
    }

    if let Some(path) = &cli.dump_frame {
        let written = serde_json::to_string_pretty(&surface.commands())
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => info!("Last frame written to {}", path.display()),
            Err(e) => warn!("Could not write {}: {}", path.display(), e),
        }
    }

    if let Err(e) = session.stop() {
        warn!("Stop failed: {}", e);
    }
    match serde_json::to_string_pretty(&session.stats()) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Could not encode stats: {}", e),
    }
}

fn offset_north(from: GeoPoint, meters: f64) -> GeoPoint {
    use spatialengine::components::geoposition::METERS_PER_DEGREE_LAT;
    GeoPoint::new(from.latitude + meters / METERS_PER_DEGREE_LAT, from.longitude)
}
