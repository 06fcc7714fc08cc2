//! Side effects queued from inside the world.
//!
//! Systems and observers cannot reach subscribers or the native bridge, which
//! live outside the [`World`](bevy_ecs::world::World). They record what has to
//! happen here and the session applies it after the schedule has run.

use bevy_ecs::prelude::Resource;

use crate::bridge::AnchorId;
use crate::events::session::SessionEvent;

#[derive(Resource, Debug, Default)]
pub struct SessionOutbox {
    pub events: Vec<SessionEvent>,
    /// Anchors of collected coins, to be removed from the bridge.
    pub released_anchors: Vec<AnchorId>,
    /// A milestone asked for the session to pause.
    pub pause_requested: bool,
}

impl SessionOutbox {
    pub fn push(&mut self, event: impl Into<SessionEvent>) {
        self.events.push(event.into());
    }

    /// Take everything queued so far, leaving the outbox empty.
    pub fn take(&mut self) -> SessionOutbox {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.released_anchors.is_empty() && !self.pause_requested
    }
}
