//! Screen-space points.
//!
//! A [`ScreenPoint`] is a pixel coordinate on the drawing surface, origin at
//! the top-left corner and `+y` pointing down. Screen points are derived from
//! world or geo positions every frame and are never attached to entities.

use serde::{Deserialize, Serialize};

/// 2D coordinates in device pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    /// Create a ScreenPoint from x and y.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Translate by delta.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// True when both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pixel dimensions of the drawing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f32,
    pub height: f32,
}

impl ScreenSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Pixel at the centre of the surface.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }
}
