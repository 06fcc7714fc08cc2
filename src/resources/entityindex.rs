//! Id lookup for store entities.
//!
//! Collectibles, markers and routes are addressed by caller-chosen string
//! ids; the index maps each id to its entity so id operations stay O(1).

use bevy_ecs::prelude::{Entity, Resource};
use rustc_hash::FxHashMap;

#[derive(Resource, Debug, Clone, Default)]
pub struct EntityIndex {
    pub collectibles: FxHashMap<String, Entity>,
    pub markers: FxHashMap<String, Entity>,
    pub routes: FxHashMap<String, Entity>,
}

impl EntityIndex {
    pub fn is_empty(&self) -> bool {
        self.collectibles.is_empty() && self.markers.is_empty() && self.routes.is_empty()
    }

    /// Every indexed entity.
    pub fn all(&self) -> impl Iterator<Item = Entity> + '_ {
        self.collectibles
            .values()
            .chain(self.markers.values())
            .chain(self.routes.values())
            .copied()
    }
}
