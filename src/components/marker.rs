//! Map marker component.
//!
//! Markers are geo-anchored pins with an optional title and colour. They are
//! addressed by id and live independently of routes. The marker's position is
//! carried by a [`GeoPosition`](super::geoposition::GeoPosition) on the same
//! entity.

use bevy_ecs::prelude::Component;

use crate::components::geoposition::GeoPoint;
use crate::resources::surface::Color;

/// Default pin colour (`#ff0000`).
pub const DEFAULT_MARKER_COLOR: Color = Color::rgb(255, 0, 0);

#[derive(Component, Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: String,
    pub title: Option<String>,
    pub color: Option<Color>,
}

impl Marker {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            color: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn pin_color(&self) -> Color {
        self.color.unwrap_or(DEFAULT_MARKER_COLOR)
    }
}

/// A marker as supplied by callers: identity plus where to put it.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerSpec {
    pub marker: Marker,
    pub position: GeoPoint,
}

impl MarkerSpec {
    pub fn new(id: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            marker: Marker::new(id),
            position,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.marker = self.marker.with_title(title);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.marker = self.marker.with_color(color);
        self
    }
}
