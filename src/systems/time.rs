//! Time update system.
//!
//! Updates the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per frame from the host's frame timestamp.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Advance `WorldTime` to the host timestamp `now` (seconds).
///
/// The first frame anchors the clock and has a zero delta, as does the first
/// frame after a resync. Timestamps that go backwards are clamped to a zero
/// delta.
pub fn update_world_time(world: &mut World, now: f64) {
    let mut wt = world.resource_mut::<WorldTime>();
    let started = *wt.started_at.get_or_insert(now);
    let elapsed = (now - started) as f32;
    let dt = if wt.frame_count == 0 || wt.resync {
        0.0
    } else {
        (elapsed - wt.elapsed).max(0.0)
    };
    wt.elapsed = wt.elapsed.max(elapsed);
    wt.delta = dt;
    wt.active += dt;
    wt.frame_count += 1;
    wt.resync = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_first_frame_has_zero_delta() {
        let mut world = World::new();
        world.insert_resource(WorldTime::default());
        update_world_time(&mut world, 1234.5);
        let wt = world.resource::<WorldTime>();
        assert!(approx_eq(wt.delta, 0.0));
        assert!(approx_eq(wt.elapsed, 0.0));
        assert_eq!(wt.frame_count, 1);
    }

    #[test]
    fn test_delta_follows_host_clock() {
        let mut world = World::new();
        world.insert_resource(WorldTime::default());
        update_world_time(&mut world, 10.0);
        update_world_time(&mut world, 10.5);
        update_world_time(&mut world, 10.75);
        let wt = world.resource::<WorldTime>();
        assert!(approx_eq(wt.delta, 0.25));
        assert!(approx_eq(wt.elapsed, 0.75));
        assert!(approx_eq(wt.active, 0.75));
    }

    #[test]
    fn test_resync_skips_paused_interval() {
        let mut world = World::new();
        world.insert_resource(WorldTime::default());
        update_world_time(&mut world, 0.0);
        update_world_time(&mut world, 1.0);
        world.resource_mut::<WorldTime>().mark_resync();
        update_world_time(&mut world, 30.0);
        update_world_time(&mut world, 30.5);
        let wt = world.resource::<WorldTime>();
        assert!(approx_eq(wt.active, 1.5));
        assert!(approx_eq(wt.elapsed, 30.5));
    }

    #[test]
    fn test_backwards_timestamp_clamps() {
        let mut world = World::new();
        world.insert_resource(WorldTime::default());
        update_world_time(&mut world, 10.0);
        update_world_time(&mut world, 11.0);
        update_world_time(&mut world, 10.5);
        let wt = world.resource::<WorldTime>();
        assert!(approx_eq(wt.delta, 0.0));
        assert!(approx_eq(wt.elapsed, 1.0));
    }
}
