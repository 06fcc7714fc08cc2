//! Running session statistics.

use bevy_ecs::prelude::Resource;
use serde::Serialize;

/// Counters updated by the collision detector and the tracking systems.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct CollectionStats {
    /// Monotonic collection counter; milestones are derived from it.
    pub collected: u32,
    pub score: u64,
    pub energy_kwh: f64,
    /// Metres walked, accumulated between consecutive fixes.
    pub distance_m: f64,
}

impl CollectionStats {
    pub fn record(&mut self, value: u32, points_per_coin: u32, energy_per_coin_kwh: f64) {
        self.collected += 1;
        self.score += u64::from(value) * u64::from(points_per_coin);
        self.energy_kwh = f64::from(self.collected) * energy_per_coin_kwh;
    }
}

/// Snapshot of a session's statistics, as returned by `Session::stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub coins_collected: u32,
    pub score: u64,
    pub energy: f64,
    pub distance: f64,
    /// Seconds spent Active.
    pub duration: f64,
}
