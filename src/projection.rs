//! Coordinate transforms between world, geo and screen space.
//!
//! Everything here is pure: a [`Projection`] only carries the two scale
//! constants and every method maps its inputs to outputs without touching
//! engine state.
//!
//! - World → screen is a simplified perspective: `scale = K / (|z| + 1)`,
//!   `x = cx + x·scale`, `y = cy − y·scale`. The `+ 1` keeps the divisor at or
//!   above one, so any finite `z` projects to a finite pixel. Points behind the
//!   viewer (`z > 0`) are projected too; culling is the caller's choice.
//! - Geo → screen is an equirectangular approximation around an origin:
//!   longitude deltas are compressed by `cos(origin.latitude)`, latitude deltas
//!   are not, and `y` grows downwards.
//! - Screen → geo is the exact algebraic inverse of geo → screen.
//!
//! NaN inputs are not trapped; they propagate into the outputs.

use serde::{Deserialize, Serialize};

use crate::components::geoposition::GeoPoint;
use crate::components::screenposition::{ScreenPoint, ScreenSize};
use crate::components::worldposition::WorldPoint;

/// Pixels per metre at one metre of depth.
pub const DEFAULT_PIXELS_PER_METER: f32 = 100.0;
/// Map pixels per degree of latitude.
pub const DEFAULT_PIXELS_PER_DEGREE: f64 = 1000.0;

/// Visible geographic extent of the map surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl MapBounds {
    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.latitude <= self.north
            && p.latitude >= self.south
            && p.longitude <= self.east
            && p.longitude >= self.west
    }
}

/// Scale constants for the three coordinate spaces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// `K` in the perspective formula.
    pub pixels_per_meter: f32,
    /// Map zoom: pixels per degree of latitude.
    pub pixels_per_degree: f64,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            pixels_per_meter: DEFAULT_PIXELS_PER_METER,
            pixels_per_degree: DEFAULT_PIXELS_PER_DEGREE,
        }
    }
}

impl Projection {
    pub fn new(pixels_per_meter: f32, pixels_per_degree: f64) -> Self {
        Self {
            pixels_per_meter,
            pixels_per_degree,
        }
    }

    /// Perspective scale for a point at depth `z`.
    pub fn perspective_scale(&self, z: f32) -> f32 {
        self.pixels_per_meter / (z.abs() + 1.0)
    }

    /// Project a viewer-relative world point onto the screen.
    pub fn world_to_screen(&self, p: WorldPoint, screen: ScreenSize) -> ScreenPoint {
        let center = screen.center();
        let scale = self.perspective_scale(p.z);
        ScreenPoint::new(center.x + p.x * scale, center.y - p.y * scale)
    }

    /// Project a geo point onto the map surface centred on `origin`.
    pub fn geo_to_screen(&self, p: &GeoPoint, origin: &GeoPoint, screen: ScreenSize) -> ScreenPoint {
        let cx = f64::from(screen.width) / 2.0;
        let cy = f64::from(screen.height) / 2.0;
        let lon_scale = self.pixels_per_degree * origin.latitude.to_radians().cos();
        let x = cx + (p.longitude - origin.longitude) * lon_scale;
        let y = cy - (p.latitude - origin.latitude) * self.pixels_per_degree;
        ScreenPoint::new(x as f32, y as f32)
    }

    /// Inverse of [`Projection::geo_to_screen`] for the same origin and surface.
    pub fn screen_to_geo(&self, s: ScreenPoint, origin: &GeoPoint, screen: ScreenSize) -> GeoPoint {
        let cx = f64::from(screen.width) / 2.0;
        let cy = f64::from(screen.height) / 2.0;
        let lon_scale = self.pixels_per_degree * origin.latitude.to_radians().cos();
        let longitude = origin.longitude + (f64::from(s.x) - cx) / lon_scale;
        let latitude = origin.latitude + (cy - f64::from(s.y)) / self.pixels_per_degree;
        GeoPoint::new(latitude, longitude)
    }

    /// Geographic rectangle covered by a surface of `screen` size around `origin`.
    pub fn map_bounds(&self, origin: &GeoPoint, screen: ScreenSize) -> MapBounds {
        let north_west = self.screen_to_geo(ScreenPoint::new(0.0, 0.0), origin, screen);
        let south_east =
            self.screen_to_geo(ScreenPoint::new(screen.width, screen.height), origin, screen);
        MapBounds {
            north: north_west.latitude,
            south: south_east.latitude,
            east: south_east.longitude,
            west: north_west.longitude,
        }
    }

    /// Intersect the pixel `s` with the horizontal plane `y = plane_y`
    /// (viewer-relative) by inverting the perspective formula.
    ///
    /// Returns the viewer-relative hit point, or `None` when the pixel lies on
    /// the other side of the horizon or closer than the projection can express.
    pub fn screen_to_ground(&self, s: ScreenPoint, screen: ScreenSize, plane_y: f32) -> Option<WorldPoint> {
        let center = screen.center();
        let rise = center.y - s.y;
        let scale = rise / plane_y;
        if !(scale > 0.0) || scale > self.pixels_per_meter {
            return None;
        }
        let depth = self.pixels_per_meter / scale - 1.0;
        let x = (s.x - center.x) / scale;
        Some(WorldPoint::new(x, plane_y, -depth))
    }
}
