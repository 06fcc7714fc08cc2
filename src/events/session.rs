//! Events delivered to session subscribers.
//!
//! Observers and systems inside the world never call listeners directly;
//! they queue [`SessionEvent`]s into
//! [`SessionOutbox`](crate::resources::outbox::SessionOutbox) and the session
//! hands them to every subscriber once the current tick (or command) is
//! finished.

use serde::Serialize;

use crate::components::collectible::CollectibleInfo;
use crate::components::geoposition::GeoPoint;
use crate::components::screenposition::ScreenPoint;
use crate::components::worldposition::WorldPoint;
use crate::errors::ResourceUnavailable;
use crate::resources::sessionstate::SessionStates;

/// Handle returned by `Session::subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// User-visible notice about degraded operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// Static background replaces the video feed.
    CameraUnavailable { reason: String },
    /// Fixed reference point replaces live location.
    LocationUnavailable { reason: String },
    NativeArUnavailable { reason: String },
    /// The initial fix did not arrive in time; tracking continues.
    FixTimeout { waited_ms: u64 },
    /// No position update for a while; the last known value is kept.
    TrackingGap { seconds: f32 },
    TrackingRestored,
}

impl Advisory {
    /// Short text suitable for a toast.
    pub fn message(&self) -> String {
        match self {
            Advisory::CameraUnavailable { .. } => {
                "Camera unavailable, showing a static background".to_string()
            }
            Advisory::LocationUnavailable { .. } => {
                "Location unavailable, using a fixed reference point".to_string()
            }
            Advisory::NativeArUnavailable { .. } => "AR not supported".to_string(),
            Advisory::FixTimeout { waited_ms } => {
                format!("Still waiting for a location fix after {} ms", waited_ms)
            }
            Advisory::TrackingGap { seconds } => {
                format!("No position update for {:.0} s", seconds)
            }
            Advisory::TrackingRestored => "Position tracking restored".to_string(),
        }
    }
}

impl From<ResourceUnavailable> for Advisory {
    fn from(err: ResourceUnavailable) -> Self {
        match err {
            ResourceUnavailable::Camera(reason) => Advisory::CameraUnavailable { reason },
            ResourceUnavailable::Location(reason) => Advisory::LocationUnavailable { reason },
            ResourceUnavailable::NativeAr(reason) => Advisory::NativeArUnavailable { reason },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        from: SessionStates,
        to: SessionStates,
    },
    /// A collectible was collected; `total` is the running count.
    Collected {
        collectible: CollectibleInfo,
        total: u32,
    },
    /// Every Nth collection; hosts show the quiz here.
    Milestone { count: u32 },
    PoseUpdated { position: WorldPoint },
    LocationUpdated { location: GeoPoint },
    MapTapped {
        location: GeoPoint,
        screen: ScreenPoint,
    },
    Advisory { advisory: Advisory },
}

impl From<Advisory> for SessionEvent {
    fn from(advisory: Advisory) -> Self {
        SessionEvent::Advisory { advisory }
    }
}
