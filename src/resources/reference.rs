//! Reference position resources.
//!
//! The world pose and the geo location are kept in two separate resources.
//! Each is replaced wholesale by the tracking systems; a world fix never
//! touches [`UserLocation`] and a geo fix never touches [`UserPose`].

use bevy_ecs::prelude::Resource;

use crate::components::geoposition::GeoPoint;
use crate::components::worldposition::WorldPoint;

/// Viewer position in world space. Starts at the session origin.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct UserPose(pub WorldPoint);

/// Last geo fix, `None` until one arrives.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct UserLocation(pub Option<GeoPoint>);

/// Bookkeeping for fix cadence.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct TrackingStatus {
    /// A live position source is attached.
    pub tracking: bool,
    /// `WorldTime::elapsed` when the last fix was applied.
    pub last_fix_at: Option<f32>,
    pub world_fixes: u64,
    pub geo_fixes: u64,
    /// A tracking-gap advisory is outstanding.
    pub in_gap: bool,
}
