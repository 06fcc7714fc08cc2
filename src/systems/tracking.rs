//! Reference position updates and tracking-gap detection.
//!
//! [`apply_position_fix`] is how a fix enters the world, whether it came from
//! a tracker poll or from the host setting the reference position directly.
//! A world fix replaces [`UserPose`]; a geo fix replaces [`UserLocation`].
//! Neither touches the other.
use bevy_ecs::prelude::*;
use log::{debug, info, warn};

use crate::events::session::Advisory;
use crate::resources::engineconfig::EngineConfig;
use crate::resources::outbox::SessionOutbox;
use crate::resources::reference::{TrackingStatus, UserLocation, UserPose};
use crate::resources::stats::CollectionStats;
use crate::resources::worldtime::WorldTime;
use crate::tracker::{Position, PositionFix};

/// Replace the reference position with `fix` and account the distance
/// walked since the previous fix of the same kind.
pub fn apply_position_fix(world: &mut World, fix: PositionFix) {
    let now = world.resource::<WorldTime>().elapsed;
    let (walked, first) = match fix.position {
        Position::World(p) => {
            let first = world.resource::<TrackingStatus>().world_fixes == 0;
            let mut pose = world.resource_mut::<UserPose>();
            let walked = f64::from(pose.0.distance(&p));
            pose.0 = p;
            world.resource_mut::<TrackingStatus>().world_fixes += 1;
            (walked, first)
        }
        Position::Geo(p) => {
            let mut location = world.resource_mut::<UserLocation>();
            let previous = location.0.replace(p);
            world.resource_mut::<TrackingStatus>().geo_fixes += 1;
            match previous {
                Some(prev) => (prev.distance_meters(&p), false),
                None => (0.0, true),
            }
        }
    };

    // NaN distances are not accumulated.
    if !first && walked.is_finite() {
        world.resource_mut::<CollectionStats>().distance_m += walked;
    }

    let was_in_gap = {
        let mut status = world.resource_mut::<TrackingStatus>();
        status.last_fix_at = Some(now);
        std::mem::replace(&mut status.in_gap, false)
    };
    if was_in_gap {
        info!("Position tracking restored");
        world
            .resource_mut::<SessionOutbox>()
            .push(Advisory::TrackingRestored);
    }
    debug!("Applied fix {:?} at t={:.2}s", fix.position, now);
}

/// Raise a tracking-gap advisory once when no fix has arrived for
/// `EngineConfig::tracking_gap_secs`. The last known value stays in use.
pub fn check_tracking_gap(
    time: Res<WorldTime>,
    config: Res<EngineConfig>,
    mut status: ResMut<TrackingStatus>,
    mut outbox: ResMut<SessionOutbox>,
) {
    if !status.tracking || status.in_gap || config.tracking_gap_secs <= 0.0 {
        return;
    }
    let silent_for = time.elapsed - status.last_fix_at.unwrap_or(0.0);
    if silent_for > config.tracking_gap_secs {
        warn!("No position update for {:.1}s, keeping last known", silent_for);
        status.in_gap = true;
        outbox.push(Advisory::TrackingGap {
            seconds: silent_for,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::geoposition::GeoPoint;
    use crate::components::worldposition::WorldPoint;
    use crate::events::session::SessionEvent;

    fn make_world() -> World {
        let mut world = World::new();
        world.insert_resource(WorldTime::default());
        world.insert_resource(EngineConfig::new());
        world.insert_resource(UserPose::default());
        world.insert_resource(UserLocation::default());
        world.insert_resource(TrackingStatus::default());
        world.insert_resource(CollectionStats::default());
        world.insert_resource(SessionOutbox::default());
        world
    }

    fn tick_gap_check(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(check_tracking_gap);
        schedule.run(world);
    }

    #[test]
    fn test_world_fix_does_not_touch_location() {
        let mut world = make_world();
        apply_position_fix(
            &mut world,
            PositionFix::world(WorldPoint::new(0.0, 0.0, -2.0), 1),
        );
        assert_eq!(world.resource::<UserPose>().0, WorldPoint::new(0.0, 0.0, -2.0));
        assert_eq!(world.resource::<UserLocation>().0, None);
    }

    #[test]
    fn test_distance_accumulates_per_kind() {
        let mut world = make_world();
        apply_position_fix(&mut world, PositionFix::world(WorldPoint::new(0.0, 0.0, -1.0), 1));
        apply_position_fix(&mut world, PositionFix::world(WorldPoint::new(0.0, 0.0, -4.0), 2));
        let origin = GeoPoint::new(10.0, 20.0);
        apply_position_fix(&mut world, PositionFix::geo(origin, 3));
        let north = GeoPoint::new(10.001, 20.0);
        apply_position_fix(&mut world, PositionFix::geo(north, 4));
        let walked = world.resource::<CollectionStats>().distance_m;
        assert!((walked - (3.0 + origin.distance_meters(&north))).abs() < 1e-6);
    }

    #[test]
    fn test_gap_advisory_fires_once_and_clears() {
        let mut world = make_world();
        world.resource_mut::<TrackingStatus>().tracking = true;
        world.resource_mut::<WorldTime>().elapsed = 6.0;
        tick_gap_check(&mut world);
        tick_gap_check(&mut world);
        let events = world.resource_mut::<SessionOutbox>().take().events;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            SessionEvent::Advisory {
                advisory: Advisory::TrackingGap { .. }
            }
        ));

        apply_position_fix(&mut world, PositionFix::world(WorldPoint::ORIGIN, 9));
        let events = world.resource_mut::<SessionOutbox>().take().events;
        assert_eq!(
            events,
            vec![SessionEvent::Advisory {
                advisory: Advisory::TrackingRestored
            }]
        );
        assert!(!world.resource::<TrackingStatus>().in_gap);
    }

    #[test]
    fn test_no_gap_without_live_source() {
        let mut world = make_world();
        world.resource_mut::<WorldTime>().elapsed = 60.0;
        tick_gap_check(&mut world);
        assert!(world.resource::<SessionOutbox>().events.is_empty());
    }
}
