use bevy_ecs::prelude::Component;

use crate::bridge::AnchorId;

/// Native anchor backing a collectible when the AR bridge is live.
#[derive(Component, Clone, Debug, PartialEq, Eq)]
pub struct Anchor(pub AnchorId);
