//! Collection event types and their observers.
//!
//! The collision detector triggers [`CoinCollectedEvent`] for every
//! collectible it collects and [`MilestoneReachedEvent`] whenever the running
//! count lands on a multiple of the milestone interval. The observers here
//! turn those into queued [`SessionEvent`]s and bridge side effects.
//!
//! Register them once per world:
//!
//! ```ignore
//! world.spawn(Observer::new(observe_coin_collected));
//! world.spawn(Observer::new(observe_milestone_reached));
//! world.flush();
//! ```
use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::{debug, info};

use crate::components::anchor::Anchor;
use crate::components::collectible::CollectibleInfo;
use crate::events::session::SessionEvent;
use crate::resources::engineconfig::EngineConfig;
use crate::resources::outbox::SessionOutbox;

/// Fired once per collectible, on the tick it was collected.
#[derive(Event, Debug, Clone)]
pub struct CoinCollectedEvent {
    pub entity: Entity,
    pub info: CollectibleInfo,
    /// Running collected count including this one.
    pub total: u32,
}

/// Fired when the collected count reaches a multiple of the interval.
#[derive(Event, Debug, Clone, Copy)]
pub struct MilestoneReachedEvent {
    pub count: u32,
}

/// Queue a `Collected` notification and release the coin's native anchor.
pub fn observe_coin_collected(
    trigger: On<CoinCollectedEvent>,
    mut commands: Commands,
    mut outbox: ResMut<SessionOutbox>,
    anchors: Query<&Anchor>,
) {
    let event = trigger.event();
    debug!(
        "Collected '{}' (value {}), total {}",
        event.info.id, event.info.value, event.total
    );
    if let Ok(anchor) = anchors.get(event.entity) {
        outbox.released_anchors.push(anchor.0.clone());
        commands.entity(event.entity).remove::<Anchor>();
    }
    outbox.push(SessionEvent::Collected {
        collectible: event.info.clone(),
        total: event.total,
    });
}

/// Queue a `Milestone` notification, and a pause when configured to.
pub fn observe_milestone_reached(
    trigger: On<MilestoneReachedEvent>,
    mut outbox: ResMut<SessionOutbox>,
    config: Res<EngineConfig>,
) {
    let count = trigger.event().count;
    info!("Milestone reached at {} collections", count);
    outbox.push(SessionEvent::Milestone { count });
    if config.pause_on_milestone {
        outbox.pause_requested = true;
    }
}
