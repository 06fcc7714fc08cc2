//! Entity store.
//!
//! Collectibles, routes and markers are entities of the session's
//! [`World`]; this module is the id-keyed facade over them. Every function is
//! synchronous, does no I/O and costs O(1) or O(n) in the number of entities.
//! [`EntityIndex`] maps ids to entities and is kept in step with every spawn
//! and despawn here.
//!
//! Native anchors are not created or removed here. Functions that drop
//! anchored collectibles return the [`AnchorId`]s so the caller can release
//! them on the bridge.

use bevy_ecs::prelude::*;

use crate::bridge::AnchorId;
use crate::components::anchor::Anchor;
use crate::components::collectible::{Collectible, CollectibleInfo, CollectiblePlacement};
use crate::components::geoposition::{GeoPoint, GeoPosition};
use crate::components::marker::{Marker, MarkerSpec};
use crate::components::route::Route;
use crate::components::worldposition::{WorldPoint, WorldPosition};
use crate::resources::entityindex::EntityIndex;

/// Layout of a batch of world-space collectibles.
///
/// Coin `i` sits at `z = start_z - i * spacing`, `y = height`, with `x` drawn
/// uniformly from `[-jitter, jitter]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPattern {
    pub count: u32,
    pub spacing: f32,
    pub jitter: f32,
    pub start_z: f32,
    pub height: f32,
    pub value: u32,
}

impl Default for SpawnPattern {
    fn default() -> Self {
        Self {
            count: 15,
            spacing: 2.0,
            jitter: 1.0,
            start_z: 0.0,
            height: 0.0,
            value: 1,
        }
    }
}

impl SpawnPattern {
    pub fn new(count: u32, spacing: f32, jitter: f32) -> Self {
        Self {
            count,
            spacing,
            jitter,
            ..Default::default()
        }
    }

    pub fn with_start_z(mut self, start_z: f32) -> Self {
        self.start_z = start_z;
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    /// Positions for the whole batch, in spawn order.
    pub fn positions(&self, rng: &mut fastrand::Rng) -> Vec<WorldPoint> {
        let jitter = self.jitter.abs();
        (0..self.count)
            .map(|i| {
                let x = if jitter > 0.0 {
                    (rng.f32() * 2.0 - 1.0) * jitter
                } else {
                    0.0
                };
                WorldPoint::new(x, self.height, self.start_z - i as f32 * self.spacing)
            })
            .collect()
    }
}

fn info_of(collectible: &Collectible, placement: CollectiblePlacement) -> CollectibleInfo {
    CollectibleInfo {
        id: collectible.id.clone(),
        placement,
        collected: collectible.is_collected(),
        value: collectible.value,
    }
}

/// Spawn a fresh batch of world-space collectibles.
///
/// Existing collectibles are removed first; their anchors are returned along
/// with the new batch.
pub fn spawn_collectibles(
    world: &mut World,
    pattern: &SpawnPattern,
    rng: &mut fastrand::Rng,
) -> (Vec<CollectibleInfo>, Vec<AnchorId>) {
    let released = clear_collectibles(world);
    let mut spawned = Vec::with_capacity(pattern.count as usize);
    for (i, pos) in pattern.positions(rng).into_iter().enumerate() {
        let collectible = Collectible::new(format!("coin-{}", i), i as u32, pattern.value);
        spawned.push(info_of(&collectible, CollectiblePlacement::World(pos)));
        let entity = world
            .spawn((collectible, WorldPosition::from_point(pos)))
            .id();
        world
            .resource_mut::<EntityIndex>()
            .collectibles
            .insert(format!("coin-{}", i), entity);
    }
    (spawned, released)
}

/// Spawn geo-anchored collectibles at the given locations, replacing any
/// existing collectibles.
pub fn spawn_geo_collectibles(
    world: &mut World,
    locations: &[GeoPoint],
    value: u32,
) -> (Vec<CollectibleInfo>, Vec<AnchorId>) {
    let released = clear_collectibles(world);
    let mut spawned = Vec::with_capacity(locations.len());
    for (i, pos) in locations.iter().enumerate() {
        let id = format!("geo-coin-{}", i);
        let collectible = Collectible::new(id.clone(), i as u32, value);
        spawned.push(info_of(&collectible, CollectiblePlacement::Geo(*pos)));
        let entity = world.spawn((collectible, GeoPosition::from_point(*pos))).id();
        world
            .resource_mut::<EntityIndex>()
            .collectibles
            .insert(id, entity);
    }
    (spawned, released)
}

/// Attach a native anchor to the collectible `id`.
pub fn attach_anchor(world: &mut World, id: &str, anchor: AnchorId) -> bool {
    let Some(entity) = world.resource::<EntityIndex>().collectibles.get(id).copied() else {
        return false;
    };
    match world.get_entity_mut(entity) {
        Ok(mut e) => {
            e.insert(Anchor(anchor));
            true
        }
        Err(_) => false,
    }
}

/// Flip the collected flag of `id`.
///
/// Returns the entity and its updated snapshot when this call performed the
/// transition; `None` for unknown ids and already collected ones.
pub fn mark_collected(world: &mut World, id: &str) -> Option<(Entity, CollectibleInfo)> {
    let entity = world.resource::<EntityIndex>().collectibles.get(id).copied()?;
    let placement = placement_of(world, entity)?;
    let mut collectible = world.get_mut::<Collectible>(entity)?;
    if !collectible.collect() {
        return None;
    }
    Some((entity, info_of(&collectible, placement)))
}

/// Remove one collected collectible. Uncollected ones are left alone.
pub fn remove_collectible(world: &mut World, id: &str) -> bool {
    let Some(entity) = world.resource::<EntityIndex>().collectibles.get(id).copied() else {
        return false;
    };
    let collected = world
        .get::<Collectible>(entity)
        .is_some_and(Collectible::is_collected);
    if !collected {
        return false;
    }
    world.resource_mut::<EntityIndex>().collectibles.remove(id);
    world.despawn(entity)
}

/// Remove every collectible, returning the anchors still attached.
pub fn clear_collectibles(world: &mut World) -> Vec<AnchorId> {
    let entities: Vec<Entity> = world
        .resource_mut::<EntityIndex>()
        .collectibles
        .drain()
        .map(|(_, e)| e)
        .collect();
    despawn_all(world, entities)
}

fn despawn_all(world: &mut World, entities: Vec<Entity>) -> Vec<AnchorId> {
    let mut anchors = Vec::new();
    for entity in entities {
        if let Some(anchor) = world.get::<Anchor>(entity) {
            anchors.push(anchor.0.clone());
        }
        world.despawn(entity);
    }
    anchors
}

/// Replace the route with the same id, or add it.
pub fn upsert_route(world: &mut World, route: Route) {
    let existing = world.resource::<EntityIndex>().routes.get(&route.id).copied();
    if let Some(entity) = existing
        && let Some(mut slot) = world.get_mut::<Route>(entity)
    {
        *slot = route;
        return;
    }
    let id = route.id.clone();
    let entity = world.spawn(route).id();
    world.resource_mut::<EntityIndex>().routes.insert(id, entity);
}

pub fn remove_route(world: &mut World, id: &str) -> bool {
    match world.resource_mut::<EntityIndex>().routes.remove(id) {
        Some(entity) => world.despawn(entity),
        None => false,
    }
}

pub fn clear_routes(world: &mut World) {
    let entities: Vec<Entity> = world
        .resource_mut::<EntityIndex>()
        .routes
        .drain()
        .map(|(_, e)| e)
        .collect();
    despawn_all(world, entities);
}

pub fn route(world: &World, id: &str) -> Option<Route> {
    let entity = world.resource::<EntityIndex>().routes.get(id).copied()?;
    world.get::<Route>(entity).cloned()
}

/// Add a marker; a marker with the same id is replaced.
pub fn add_marker(world: &mut World, spec: MarkerSpec) {
    let MarkerSpec { marker, position } = spec;
    let existing = world.resource::<EntityIndex>().markers.get(&marker.id).copied();
    if let Some(entity) = existing
        && let Ok(mut e) = world.get_entity_mut(entity)
    {
        e.insert((marker, GeoPosition::from_point(position)));
        return;
    }
    let id = marker.id.clone();
    let entity = world.spawn((marker, GeoPosition::from_point(position))).id();
    world.resource_mut::<EntityIndex>().markers.insert(id, entity);
}

pub fn remove_marker(world: &mut World, id: &str) -> bool {
    match world.resource_mut::<EntityIndex>().markers.remove(id) {
        Some(entity) => world.despawn(entity),
        None => false,
    }
}

pub fn clear_markers(world: &mut World) {
    let entities: Vec<Entity> = world
        .resource_mut::<EntityIndex>()
        .markers
        .drain()
        .map(|(_, e)| e)
        .collect();
    despawn_all(world, entities);
}

pub fn marker_position(world: &World, id: &str) -> Option<GeoPoint> {
    let entity = world.resource::<EntityIndex>().markers.get(id).copied()?;
    world.get::<GeoPosition>(entity).map(|g| g.pos)
}

/// Empty the store, returning every anchor that was still attached.
pub fn clear(world: &mut World) -> Vec<AnchorId> {
    let anchors = clear_collectibles(world);
    clear_routes(world);
    clear_markers(world);
    anchors
}

fn placement_of(world: &World, entity: Entity) -> Option<CollectiblePlacement> {
    if let Some(wp) = world.get::<WorldPosition>(entity) {
        return Some(CollectiblePlacement::World(wp.pos));
    }
    world
        .get::<GeoPosition>(entity)
        .map(|gp| CollectiblePlacement::Geo(gp.pos))
}

/// Snapshots of all collectibles in spawn order.
pub fn collectibles(world: &World) -> Vec<CollectibleInfo> {
    let index = world.resource::<EntityIndex>();
    let mut out: Vec<(u32, CollectibleInfo)> = index
        .collectibles
        .values()
        .filter_map(|&entity| {
            let c = world.get::<Collectible>(entity)?;
            Some((c.index, info_of(c, placement_of(world, entity)?)))
        })
        .collect();
    out.sort_by_key(|(i, _)| *i);
    out.into_iter().map(|(_, info)| info).collect()
}

pub fn markers(world: &World) -> Vec<MarkerSpec> {
    let index = world.resource::<EntityIndex>();
    let mut out: Vec<MarkerSpec> = index
        .markers
        .values()
        .filter_map(|&entity| {
            let marker = world.get::<Marker>(entity)?.clone();
            let position = world.get::<GeoPosition>(entity)?.pos;
            Some(MarkerSpec { marker, position })
        })
        .collect();
    out.sort_by(|a, b| a.marker.id.cmp(&b.marker.id));
    out
}
