//! Geographic position component.
//!
//! [`GeoPoint`] holds latitude/longitude in degrees and an optional altitude in
//! metres. It is what location providers report and what the map view draws.
//! Distances between geo points use the same equirectangular approximation as
//! the map projection in [`crate::projection`].

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// Metres spanned by one degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Metres spanned by one degree of longitude at `latitude` degrees.
pub fn meters_per_degree_lon(latitude: f64) -> f64 {
    METERS_PER_DEGREE_LAT * latitude.to_radians().cos()
}

/// A geographic coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Planar (east, north) offset of `other` from `self`, in metres.
    pub fn offset_meters(&self, other: &GeoPoint) -> (f64, f64) {
        let east = (other.longitude - self.longitude) * meters_per_degree_lon(self.latitude);
        let north = (other.latitude - self.latitude) * METERS_PER_DEGREE_LAT;
        (east, north)
    }

    /// Ground distance to `other` in metres. Altitude is ignored.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let (east, north) = self.offset_meters(other);
        (east * east + north * north).sqrt()
    }
}

/// Geographic position of an entity (map marker, geo-anchored collectible).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct GeoPosition {
    pub pos: GeoPoint,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            pos: GeoPoint::new(latitude, longitude),
        }
    }

    pub fn from_point(pos: GeoPoint) -> Self {
        Self { pos }
    }
}
