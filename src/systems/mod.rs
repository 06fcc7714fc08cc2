//! Engine systems.
//!
//! This module groups the ECS systems and world functions that make up one
//! frame of a session.
//!
//! Submodules overview
//! - [`collision`] – proximity collection and milestone triggering
//! - [`render`] – paint the frame into the drawing surface
//! - [`time`] – advance the frame clock
//! - [`tracking`] – apply position fixes and detect tracking gaps

pub mod collision;
pub mod render;
pub mod time;
pub mod tracking;

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

use crate::systems::collision::collision_detector;
use crate::systems::render::{render_background, render_entities, render_prepare, render_routes};
use crate::systems::tracking::check_tracking_gap;

/// Build the per-frame schedule.
///
/// Paint steps run first, strictly in order, and the collision detector runs
/// last, so a frame always draws the state it started with. Everything runs
/// on the calling thread.
pub fn frame_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            render_prepare,
            render_background,
            render_routes,
            render_entities,
            collision_detector,
        )
            .chain(),
    );
    schedule.add_systems(check_tracking_gap.before(collision_detector));
    schedule
}
