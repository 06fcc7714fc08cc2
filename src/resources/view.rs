//! View settings resource.
//!
//! Which background the renderer paints and which optional features came up
//! live during initialization.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

/// What the session renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// AR view: camera passthrough with world-space collectibles.
    #[default]
    Camera,
    /// Flat map with geo routes and markers.
    Map,
}

#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct ViewSettings {
    pub mode: ViewMode,
    /// Camera stream acquired; otherwise the static gradient is drawn.
    pub camera_live: bool,
    pub hit_testing: bool,
}
