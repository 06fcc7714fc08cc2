//! World-space position component.
//!
//! World space is the local 3D frame anchored where the session started:
//! metres, `+y` up and the camera looking down `-z`. The [`WorldPosition`]
//! component pins an entity (coin, path vertex) into that frame.
//!
//! For geographic entities see
//! [`GeoPosition`](super::geoposition::GeoPosition). The two are never mixed
//! on one entity.

use std::ops::{Add, Sub};

use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

/// A point in the local world frame, in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPoint {
    pub const ORIGIN: WorldPoint = WorldPoint {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length of the vector from the origin.
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to `other` in metres.
    ///
    /// NaN components yield NaN, which never compares below a threshold.
    pub fn distance(&self, other: &WorldPoint) -> f32 {
        (*self - *other).length()
    }
}

impl Add for WorldPoint {
    type Output = WorldPoint;

    fn add(self, rhs: WorldPoint) -> WorldPoint {
        WorldPoint::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for WorldPoint {
    type Output = WorldPoint;

    fn sub(self, rhs: WorldPoint) -> WorldPoint {
        WorldPoint::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// World-space position of an entity.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct WorldPosition {
    pub pos: WorldPoint,
}

impl WorldPosition {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            pos: WorldPoint::new(x, y, z),
        }
    }

    pub fn from_point(pos: WorldPoint) -> Self {
        Self { pos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_distance_is_euclidean() {
        let a = WorldPoint::new(0.0, 0.0, 0.0);
        let b = WorldPoint::new(3.0, 4.0, 0.0);
        assert!(approx_eq(a.distance(&b), 5.0));
        assert!(approx_eq(b.distance(&a), 5.0));
    }

    #[test]
    fn test_distance_along_forward_axis() {
        let a = WorldPoint::new(0.0, 0.0, -2.0);
        let b = WorldPoint::new(0.0, 0.0, -4.0);
        assert!(approx_eq(a.distance(&b), 2.0));
    }

    #[test]
    fn test_nan_distance_never_below_threshold() {
        let a = WorldPoint::new(f32::NAN, 0.0, 0.0);
        let d = a.distance(&WorldPoint::ORIGIN);
        assert!(!(d < 0.5));
    }

    #[test]
    fn test_sub_and_add() {
        let a = WorldPoint::new(1.0, 2.0, 3.0);
        let b = WorldPoint::new(0.5, 0.5, 0.5);
        let d = a - b;
        assert!(approx_eq(d.x, 0.5));
        assert!(approx_eq(d.y, 1.5));
        assert!(approx_eq(d.z, 2.5));
        let s = d + b;
        assert_eq!(s, a);
    }

    #[test]
    fn test_position_component_wraps_point() {
        let p = WorldPosition::new(1.0, 0.0, -2.0);
        assert!(approx_eq(p.pos.z, -2.0));
        assert_eq!(WorldPosition::default().pos, WorldPoint::ORIGIN);
    }
}
