//! Engine configuration resource.
//!
//! Tuning constants loaded from an INI configuration file, with compiled-in
//! defaults for a safe start when the file is missing or partial.
//!
//! # Configuration File Format
//!
//! ```ini
//! [projection]
//! pixels_per_meter = 100
//! pixels_per_degree = 1000
//! hit_test_plane_y = -0.5
//!
//! [collection]
//! radius = 0.5
//! milestone_interval = 5
//! energy_per_coin_kwh = 0.1
//! points_per_coin = 10
//! pause_on_milestone = false
//!
//! [spawn]
//! count = 15
//! spacing = 2
//! jitter = 1
//! start_z = 0
//! height = 0
//! value = 1
//! seed = 42
//!
//! [pulse]
//! amplitude = 0.1
//! frequency = 2
//!
//! [location]
//! fix_timeout_ms = 10000
//! tracking_gap_secs = 5
//! fallback_latitude = 0
//! fallback_longitude = 0
//!
//! [reporting]
//! user_id = demo-user
//! local_log = ./ar_sessions.jsonl
//! ```

use std::path::PathBuf;
use std::time::Duration;

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::{info, warn};

use crate::components::geoposition::GeoPoint;
use crate::errors::ConfigError;
use crate::projection::{DEFAULT_PIXELS_PER_DEGREE, DEFAULT_PIXELS_PER_METER, Projection};
use crate::store::SpawnPattern;

/// Default safe values for startup
const DEFAULT_HIT_TEST_PLANE_Y: f32 = -0.5;
const DEFAULT_COLLECTION_RADIUS: f32 = 0.5;
const DEFAULT_MILESTONE_INTERVAL: u32 = 5;
const DEFAULT_ENERGY_PER_COIN_KWH: f64 = 0.1;
const DEFAULT_POINTS_PER_COIN: u32 = 10;
const DEFAULT_PULSE_AMPLITUDE: f32 = 0.1;
const DEFAULT_PULSE_FREQUENCY: f32 = 2.0;
const DEFAULT_FIX_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_TRACKING_GAP_SECS: f32 = 5.0;
const DEFAULT_USER_ID: &str = "demo-user";
const DEFAULT_LOCAL_LOG: &str = "./ar_sessions.jsonl";
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Engine configuration resource.
///
/// None of these are user-facing settings; they are the engine's constants,
/// kept in one place so tests and deployments can pin them.
#[derive(Resource, Debug, Clone)]
pub struct EngineConfig {
    /// Perspective `K`: pixels per metre at one metre of depth.
    pub pixels_per_meter: f32,
    /// Map zoom in pixels per degree.
    pub pixels_per_degree: f64,
    /// Viewer-relative height of the plane used for hit tests.
    pub hit_test_plane_y: f32,
    /// Distance in metres under which a collectible is collected.
    pub collection_radius: f32,
    /// A milestone fires every this many collections. Never zero.
    pub milestone_interval: u32,
    pub energy_per_coin_kwh: f64,
    pub points_per_coin: u32,
    /// Pause the session as soon as a milestone fires.
    pub pause_on_milestone: bool,
    /// Default layout for spawned collectibles.
    pub spawn: SpawnPattern,
    /// Fixed RNG seed for spawn jitter; random when unset.
    pub spawn_seed: Option<u64>,
    pub pulse_amplitude: f32,
    /// Angular frequency of the pulse animation, radians per second.
    pub pulse_frequency: f32,
    /// Bounded wait for the initial one-shot location fix.
    pub fix_timeout: Duration,
    /// Seconds without a fix before a tracking-gap advisory is raised.
    pub tracking_gap_secs: f32,
    /// Reference location used while no real fix is available.
    pub fallback_location: GeoPoint,
    pub user_id: String,
    /// Where summaries go when the endpoint is unreachable.
    pub local_log: PathBuf,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            pixels_per_meter: DEFAULT_PIXELS_PER_METER,
            pixels_per_degree: DEFAULT_PIXELS_PER_DEGREE,
            hit_test_plane_y: DEFAULT_HIT_TEST_PLANE_Y,
            collection_radius: DEFAULT_COLLECTION_RADIUS,
            milestone_interval: DEFAULT_MILESTONE_INTERVAL,
            energy_per_coin_kwh: DEFAULT_ENERGY_PER_COIN_KWH,
            points_per_coin: DEFAULT_POINTS_PER_COIN,
            pause_on_milestone: false,
            spawn: SpawnPattern::default(),
            spawn_seed: None,
            pulse_amplitude: DEFAULT_PULSE_AMPLITUDE,
            pulse_frequency: DEFAULT_PULSE_FREQUENCY,
            fix_timeout: Duration::from_millis(DEFAULT_FIX_TIMEOUT_MS),
            tracking_gap_secs: DEFAULT_TRACKING_GAP_SECS,
            fallback_location: GeoPoint::new(0.0, 0.0),
            user_id: DEFAULT_USER_ID.to_string(),
            local_log: PathBuf::from(DEFAULT_LOCAL_LOG),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    pub fn with_collection_radius(mut self, radius: f32) -> Self {
        self.collection_radius = radius;
        self
    }

    /// Zero is ignored; the interval must stay positive.
    pub fn with_milestone_interval(mut self, interval: u32) -> Self {
        if interval > 0 {
            self.milestone_interval = interval;
        }
        self
    }

    pub fn with_fix_timeout(mut self, timeout: Duration) -> Self {
        self.fix_timeout = timeout;
        self
    }

    pub fn with_spawn_seed(mut self, seed: u64) -> Self {
        self.spawn_seed = Some(seed);
        self
    }

    /// Scale constants for the coordinate transforms.
    pub fn projection(&self) -> Projection {
        Projection::new(self.pixels_per_meter, self.pixels_per_degree)
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        config.load(&self.config_path).map_err(ConfigError::Load)?;
        self.apply(&config);
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        config.read(text.to_string()).map_err(ConfigError::Load)?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        let float = |section: &str, key: &str| config.getfloat(section, key).ok().flatten();
        let uint = |section: &str, key: &str| config.getuint(section, key).ok().flatten();
        let boolean = |section: &str, key: &str| config.getbool(section, key).ok().flatten();
        let uint32 = |section: &str, key: &str| -> Option<u32> {
            let v = uint(section, key)?;
            match u32::try_from(v) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring [{}] {} = {}, out of range", section, key, v);
                    None
                }
            }
        };

        // [projection] section
        if let Some(v) = float("projection", "pixels_per_meter") {
            self.pixels_per_meter = v as f32;
        }
        if let Some(v) = float("projection", "pixels_per_degree") {
            self.pixels_per_degree = v;
        }
        if let Some(v) = float("projection", "hit_test_plane_y") {
            self.hit_test_plane_y = v as f32;
        }

        // [collection] section
        if let Some(v) = float("collection", "radius") {
            if v > 0.0 && v.is_finite() {
                self.collection_radius = v as f32;
            } else {
                warn!("Ignoring collection radius {}, keeping {}", v, self.collection_radius);
            }
        }
        if let Some(v) = uint32("collection", "milestone_interval") {
            if v > 0 {
                self.milestone_interval = v;
            } else {
                warn!(
                    "Ignoring milestone_interval = 0, keeping {}",
                    self.milestone_interval
                );
            }
        }
        if let Some(v) = float("collection", "energy_per_coin_kwh") {
            self.energy_per_coin_kwh = v;
        }
        if let Some(v) = uint32("collection", "points_per_coin") {
            self.points_per_coin = v;
        }
        if let Some(v) = boolean("collection", "pause_on_milestone") {
            self.pause_on_milestone = v;
        }

        // [spawn] section
        if let Some(v) = uint32("spawn", "count") {
            self.spawn.count = v;
        }
        if let Some(v) = float("spawn", "spacing") {
            self.spawn.spacing = v as f32;
        }
        if let Some(v) = float("spawn", "jitter") {
            self.spawn.jitter = v as f32;
        }
        if let Some(v) = float("spawn", "start_z") {
            self.spawn.start_z = v as f32;
        }
        if let Some(v) = float("spawn", "height") {
            self.spawn.height = v as f32;
        }
        if let Some(v) = uint32("spawn", "value") {
            self.spawn.value = v;
        }
        if let Some(v) = uint("spawn", "seed") {
            self.spawn_seed = Some(v);
        }

        // [pulse] section
        if let Some(v) = float("pulse", "amplitude") {
            self.pulse_amplitude = v as f32;
        }
        if let Some(v) = float("pulse", "frequency") {
            self.pulse_frequency = v as f32;
        }

        // [location] section
        if let Some(v) = uint("location", "fix_timeout_ms") {
            self.fix_timeout = Duration::from_millis(v);
        }
        if let Some(v) = float("location", "tracking_gap_secs") {
            self.tracking_gap_secs = v as f32;
        }
        if let Some(v) = float("location", "fallback_latitude") {
            self.fallback_location.latitude = v;
        }
        if let Some(v) = float("location", "fallback_longitude") {
            self.fallback_location.longitude = v;
        }

        // [reporting] section
        if let Some(v) = config.get("reporting", "user_id") {
            self.user_id = v;
        }
        if let Some(v) = config.get("reporting", "local_log") {
            self.local_log = PathBuf::from(v);
        }

        info!(
            "Loaded config: radius={}m, milestone every {}, K={}px/m, {}px/deg, fix timeout {:?}",
            self.collection_radius,
            self.milestone_interval,
            self.pixels_per_meter,
            self.pixels_per_degree,
            self.fix_timeout
        );
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        let mut set = |section: &str, key: &str, value: String| {
            config.set(section, key, Some(value));
        };

        set("projection", "pixels_per_meter", self.pixels_per_meter.to_string());
        set("projection", "pixels_per_degree", self.pixels_per_degree.to_string());
        set("projection", "hit_test_plane_y", self.hit_test_plane_y.to_string());

        set("collection", "radius", self.collection_radius.to_string());
        set("collection", "milestone_interval", self.milestone_interval.to_string());
        set("collection", "energy_per_coin_kwh", self.energy_per_coin_kwh.to_string());
        set("collection", "points_per_coin", self.points_per_coin.to_string());
        set("collection", "pause_on_milestone", self.pause_on_milestone.to_string());

        set("spawn", "count", self.spawn.count.to_string());
        set("spawn", "spacing", self.spawn.spacing.to_string());
        set("spawn", "jitter", self.spawn.jitter.to_string());
        set("spawn", "start_z", self.spawn.start_z.to_string());
        set("spawn", "height", self.spawn.height.to_string());
        set("spawn", "value", self.spawn.value.to_string());
        if let Some(seed) = self.spawn_seed {
            set("spawn", "seed", seed.to_string());
        }

        set("pulse", "amplitude", self.pulse_amplitude.to_string());
        set("pulse", "frequency", self.pulse_frequency.to_string());

        set("location", "fix_timeout_ms", self.fix_timeout.as_millis().to_string());
        set("location", "tracking_gap_secs", self.tracking_gap_secs.to_string());
        set("location", "fallback_latitude", self.fallback_location.latitude.to_string());
        set("location", "fallback_longitude", self.fallback_location.longitude.to_string());

        set("reporting", "user_id", self.user_id.clone());
        set("reporting", "local_log", self.local_log.display().to_string());

        config
            .write(&self.config_path)
            .map_err(|e| ConfigError::Save(e.to_string()))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::new();
        assert_eq!(c.milestone_interval, 5);
        assert!((c.collection_radius - 0.5).abs() < 1e-6);
        assert_eq!(c.fix_timeout, Duration::from_secs(10));
        assert_eq!(c.spawn.count, 15);
    }

    #[test]
    fn test_load_from_str_overrides_only_present_keys() {
        let mut c = EngineConfig::new();
        c.load_from_str(
            "[collection]\nradius = 0.4\nmilestone_interval = 4\n\n[spawn]\nseed = 7\n",
        )
        .unwrap();
        assert!((c.collection_radius - 0.4).abs() < 1e-6);
        assert_eq!(c.milestone_interval, 4);
        assert_eq!(c.spawn_seed, Some(7));
        assert_eq!(c.points_per_coin, 10);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut c = EngineConfig::new();
        c.load_from_str("[collection]\nmilestone_interval = 0\n").unwrap();
        assert_eq!(c.milestone_interval, 5);
        assert_eq!(EngineConfig::new().with_milestone_interval(0).milestone_interval, 5);
    }

    #[test]
    fn test_out_of_range_counts_keep_defaults() {
        let mut c = EngineConfig::new();
        c.load_from_str(
            "[collection]\nmilestone_interval = 4294967296\npoints_per_coin = 4294967297\n\n[spawn]\ncount = 99999999999\n",
        )
        .unwrap();
        assert_eq!(c.milestone_interval, 5);
        assert_eq!(c.points_per_coin, 10);
        assert_eq!(c.spawn.count, 15);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut c = EngineConfig::with_path("/definitely/not/here/config.ini");
        assert!(c.load_from_file().is_err());
    }

    #[test]
    fn test_save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let mut c = EngineConfig::with_path(&path)
            .with_collection_radius(0.45)
            .with_milestone_interval(4);
        c.user_id = "walker-1".to_string();
        c.save_to_file().unwrap();

        let mut loaded = EngineConfig::with_path(&path);
        loaded.load_from_file().unwrap();
        assert!((loaded.collection_radius - 0.45).abs() < 1e-6);
        assert_eq!(loaded.milestone_interval, 4);
        assert_eq!(loaded.user_id, "walker-1");
    }
}
