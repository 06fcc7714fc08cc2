//! Route / path component.
//!
//! A [`Route`] is an ordered polyline plus its drawing style. The geometry is
//! either entirely world-space (the AR walking path) or entirely geo-space (a
//! map route); one route never mixes the two. Routes are replaced wholesale by
//! id and never edited in place.

use bevy_ecs::prelude::Component;

use crate::components::geoposition::GeoPoint;
use crate::components::worldposition::WorldPoint;
use crate::resources::surface::Color;

/// Id of the single AR walking path slot.
pub const AR_PATH_ID: &str = "ar-path";

#[derive(Clone, Debug, PartialEq)]
pub enum RouteGeometry {
    World(Vec<WorldPoint>),
    Geo(Vec<GeoPoint>),
}

impl RouteGeometry {
    pub fn len(&self) -> usize {
        match self {
            RouteGeometry::World(points) => points.len(),
            RouteGeometry::Geo(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteStyle {
    /// World paths: metres across. Geo routes: pixels.
    pub width: f32,
    pub color: Color,
}

#[derive(Component, Clone, Debug, PartialEq)]
pub struct Route {
    pub id: String,
    pub geometry: RouteGeometry,
    pub style: RouteStyle,
}

impl Route {
    /// A world-space path, e.g. the lane the user should walk along.
    pub fn world(id: impl Into<String>, points: Vec<WorldPoint>, width: f32, color: Color) -> Self {
        Self {
            id: id.into(),
            geometry: RouteGeometry::World(points),
            style: RouteStyle { width, color },
        }
    }

    /// A geo-space route drawn on the map.
    pub fn geo(id: impl Into<String>, points: Vec<GeoPoint>, width: f32, color: Color) -> Self {
        Self {
            id: id.into(),
            geometry: RouteGeometry::Geo(points),
            style: RouteStyle { width, color },
        }
    }
}
