//! Proximity collection.
//!
//! [`collision_detector`] runs as the last step of every frame. Each
//! uncollected collectible is measured against the reference position of its
//! own coordinate system: world coins against [`UserPose`], geo coins against
//! [`UserLocation`]. Geo coins are skipped until a real fix exists.
//!
//! Anything strictly closer than `EngineConfig::collection_radius` is
//! collected. A NaN distance compares false and is therefore never collected.
use bevy_ecs::prelude::*;
use log::debug;
use smallvec::SmallVec;

use crate::components::collectible::{Collectible, CollectibleInfo, CollectiblePlacement};
use crate::components::geoposition::GeoPosition;
use crate::components::worldposition::WorldPosition;
use crate::events::collection::{CoinCollectedEvent, MilestoneReachedEvent};
use crate::resources::engineconfig::EngineConfig;
use crate::resources::reference::{UserLocation, UserPose};
use crate::resources::stats::CollectionStats;

/// Collect every collectible within range of the current reference position.
///
/// Hits of one tick are processed in spawn order. The counter is incremented
/// once per collection and the milestone check `count % N == 0` runs after
/// each increment, so a milestone fires exactly once per multiple of `N`
/// even when several coins are collected on the same tick.
pub fn collision_detector(
    mut commands: Commands,
    config: Res<EngineConfig>,
    pose: Res<UserPose>,
    location: Res<UserLocation>,
    mut stats: ResMut<CollectionStats>,
    mut query: Query<(
        Entity,
        &mut Collectible,
        Option<&WorldPosition>,
        Option<&GeoPosition>,
    )>,
) {
    let radius = config.collection_radius;
    let mut hits: SmallVec<[(u32, Entity, CollectiblePlacement); 4]> = SmallVec::new();

    for (entity, collectible, world_pos, geo_pos) in query.iter() {
        if collectible.is_collected() {
            continue;
        }
        let (distance, placement) = match (world_pos, geo_pos) {
            (Some(wp), _) => (pose.0.distance(&wp.pos), CollectiblePlacement::World(wp.pos)),
            (None, Some(gp)) => match location.0 {
                Some(here) => (
                    here.distance_meters(&gp.pos) as f32,
                    CollectiblePlacement::Geo(gp.pos),
                ),
                None => continue,
            },
            (None, None) => continue,
        };
        if distance < radius {
            hits.push((collectible.index, entity, placement));
        }
    }

    if hits.is_empty() {
        return;
    }
    hits.sort_by_key(|(index, _, _)| *index);

    let interval = config.milestone_interval.max(1);
    for (_, entity, placement) in hits {
        let Ok((_, mut collectible, _, _)) = query.get_mut(entity) else {
            continue;
        };
        if !collectible.collect() {
            continue;
        }
        stats.record(
            collectible.value,
            config.points_per_coin,
            config.energy_per_coin_kwh,
        );
        let total = stats.collected;
        debug!("Collectible '{}' within {}m", collectible.id, radius);

        commands.trigger(CoinCollectedEvent {
            entity,
            info: CollectibleInfo {
                id: collectible.id.clone(),
                placement,
                collected: true,
                value: collectible.value,
            },
            total,
        });
        if total % interval == 0 {
            commands.trigger(MilestoneReachedEvent { count: total });
        }
    }
}

/// Count a collection made outside the detector, such as a direct
/// `mark_collected` by id. Same bookkeeping and events as a proximity hit.
pub fn record_collection(world: &mut World, entity: Entity, info: CollectibleInfo) {
    let (interval, points_per_coin, energy_per_coin_kwh) = {
        let config = world.resource::<EngineConfig>();
        (
            config.milestone_interval.max(1),
            config.points_per_coin,
            config.energy_per_coin_kwh,
        )
    };
    let total = {
        let mut stats = world.resource_mut::<CollectionStats>();
        stats.record(info.value, points_per_coin, energy_per_coin_kwh);
        stats.collected
    };
    world.trigger(CoinCollectedEvent {
        entity,
        info,
        total,
    });
    if total % interval == 0 {
        world.trigger(MilestoneReachedEvent { count: total });
    }
}
