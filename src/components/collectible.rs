//! Collectible component.
//!
//! A [`Collectible`] is a proximity-collected item (a coin). Its position lives
//! in a separate [`WorldPosition`](super::worldposition::WorldPosition) or
//! [`GeoPosition`](super::geoposition::GeoPosition) component, never both.
//!
//! The `collected` flag only ever goes from `false` to `true`; see
//! [`Collectible::collect`].

use bevy_ecs::prelude::Component;
use serde::Serialize;

use crate::components::geoposition::GeoPoint;
use crate::components::worldposition::WorldPoint;

#[derive(Component, Clone, Debug, PartialEq)]
pub struct Collectible {
    pub id: String,
    /// Spawn order, used to stagger the pulse animation of geo coins.
    pub index: u32,
    pub value: u32,
    collected: bool,
}

impl Collectible {
    pub fn new(id: impl Into<String>, index: u32, value: u32) -> Self {
        Self {
            id: id.into(),
            index,
            value,
            collected: false,
        }
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    /// Flip the collected flag.
    ///
    /// Returns `true` only on the call that performed the transition; later
    /// calls are no-ops and return `false`.
    pub fn collect(&mut self) -> bool {
        if self.collected {
            return false;
        }
        self.collected = true;
        true
    }
}

/// Where a collectible sits. A collectible is either world- or geo-anchored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "space", rename_all = "lowercase")]
pub enum CollectiblePlacement {
    World(WorldPoint),
    Geo(GeoPoint),
}

/// Detached snapshot of a collectible, handed to callers and listeners.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectibleInfo {
    pub id: String,
    pub placement: CollectiblePlacement,
    pub collected: bool,
    pub value: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_uncollected() {
        let c = Collectible::new("coin-0", 0, 1);
        assert!(!c.is_collected());
        assert_eq!(c.value, 1);
    }

    #[test]
    fn test_collect_is_one_way() {
        let mut c = Collectible::new("coin-0", 0, 1);
        assert!(c.collect());
        assert!(c.is_collected());
        assert!(!c.collect());
        assert!(c.is_collected());
    }
}
