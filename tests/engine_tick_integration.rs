//! Engine tick integration tests for collection, milestones and rendering.
//!
//! These drive a bare `World` with one-system schedules, without a session.

use bevy_ecs::prelude::*;

use spatialengine::bridge::AnchorId;
use spatialengine::components::anchor::Anchor;
use spatialengine::components::collectible::Collectible;
use spatialengine::components::geoposition::{GeoPoint, GeoPosition};
use spatialengine::components::marker::MarkerSpec;
use spatialengine::components::route::Route;
use spatialengine::components::screenposition::ScreenSize;
use spatialengine::components::worldposition::{WorldPoint, WorldPosition};
use spatialengine::events::collection::{observe_coin_collected, observe_milestone_reached};
use spatialengine::events::session::SessionEvent;
use spatialengine::resources::engineconfig::EngineConfig;
use spatialengine::resources::entityindex::EntityIndex;
use spatialengine::resources::outbox::SessionOutbox;
use spatialengine::resources::reference::{TrackingStatus, UserLocation, UserPose};
use spatialengine::resources::stats::CollectionStats;
use spatialengine::resources::surface::{Color, DrawCommand, RecordingSurface, Surface};
use spatialengine::resources::view::{ViewMode, ViewSettings};
use spatialengine::resources::worldtime::WorldTime;
use spatialengine::store::{self, SpawnPattern};
use spatialengine::systems::collision::collision_detector;
use spatialengine::systems::frame_schedule;
use spatialengine::systems::render::{render_background, render_entities, render_prepare};
use spatialengine::systems::time::update_world_time;

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn make_world(config: EngineConfig) -> World {
    let mut world = World::new();
    world.insert_resource(config);
    world.insert_resource(WorldTime::default());
    world.insert_resource(UserPose::default());
    world.insert_resource(UserLocation::default());
    world.insert_resource(TrackingStatus::default());
    world.insert_resource(CollectionStats::default());
    world.insert_resource(SessionOutbox::default());
    world.insert_resource(EntityIndex::default());
    world.insert_resource(ViewSettings::default());
    world.spawn(Observer::new(observe_coin_collected));
    world.spawn(Observer::new(observe_milestone_reached));
    world.flush();
    world
}

fn with_surface(world: &mut World, size: ScreenSize) -> RecordingSurface {
    let surface = RecordingSurface::new(size);
    world.insert_non_send_resource(Surface(Box::new(surface.clone())));
    surface
}

fn tick_collision_detector(world: &mut World) {
    let mut schedule = Schedule::default();
    schedule.add_systems(collision_detector);
    schedule.run(world);
}

fn tick_render(world: &mut World) {
    let mut schedule = Schedule::default();
    schedule.add_systems((render_prepare, render_background, render_entities).chain());
    schedule.run(world);
}

fn spawn_line(world: &mut World, count: u32) {
    let mut rng = fastrand::Rng::with_seed(7);
    store::spawn_collectibles(world, &SpawnPattern::new(count, 2.0, 0.0), &mut rng);
}

fn move_to(world: &mut World, z: f32) {
    world.resource_mut::<UserPose>().0 = WorldPoint::new(0.0, 0.0, z);
}

fn drain(world: &mut World) -> Vec<SessionEvent> {
    world.resource_mut::<SessionOutbox>().take().events
}

fn collected_ids(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Collected { collectible, .. } => Some(collectible.id.clone()),
            _ => None,
        })
        .collect()
}

fn milestones(events: &[SessionEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Milestone { count } => Some(*count),
            _ => None,
        })
        .collect()
}

// ==================== COLLISION DETECTOR ====================

#[test]
fn test_collects_within_radius_once() {
    let mut world = make_world(EngineConfig::new().with_collection_radius(0.4));
    spawn_line(&mut world, 5);
    move_to(&mut world, -1.8);

    tick_collision_detector(&mut world);
    let events = drain(&mut world);
    assert_eq!(collected_ids(&events), vec!["coin-1".to_string()]);

    tick_collision_detector(&mut world);
    assert!(drain(&mut world).is_empty());
    assert_eq!(world.resource::<CollectionStats>().collected, 1);
}

#[test]
fn test_boundary_distance_is_not_collected() {
    let mut world = make_world(EngineConfig::new().with_collection_radius(0.5));
    spawn_line(&mut world, 2);
    move_to(&mut world, -1.5);
    tick_collision_detector(&mut world);
    assert!(drain(&mut world).is_empty());
}

#[test]
fn test_nan_pose_collects_nothing() {
    let mut world = make_world(EngineConfig::new());
    spawn_line(&mut world, 3);
    world.resource_mut::<UserPose>().0 = WorldPoint::new(f32::NAN, 0.0, 0.0);
    tick_collision_detector(&mut world);
    assert!(drain(&mut world).is_empty());
}

#[test]
fn test_milestone_fires_on_each_multiple() {
    let mut world = make_world(EngineConfig::new().with_milestone_interval(4));
    spawn_line(&mut world, 9);
    let mut fired = Vec::new();
    for i in 0..9 {
        move_to(&mut world, -2.0 * i as f32);
        tick_collision_detector(&mut world);
        fired.extend(milestones(&drain(&mut world)));
    }
    assert_eq!(fired, vec![4, 8]);
}

#[test]
fn test_two_collections_in_one_tick_cross_milestone_once() {
    let mut world = make_world(
        EngineConfig::new()
            .with_milestone_interval(4)
            .with_collection_radius(1.5),
    );
    spawn_line(&mut world, 6);
    move_to(&mut world, 0.0);
    tick_collision_detector(&mut world);
    move_to(&mut world, -3.0);
    tick_collision_detector(&mut world);
    assert_eq!(world.resource::<CollectionStats>().collected, 3);
    drain(&mut world);

    // Standing between coin-3 (z=-6) and coin-4 (z=-8) takes the count 3 -> 5.
    move_to(&mut world, -7.0);
    tick_collision_detector(&mut world);
    let events = drain(&mut world);
    assert_eq!(
        collected_ids(&events),
        vec!["coin-3".to_string(), "coin-4".to_string()]
    );
    assert_eq!(milestones(&events), vec![4]);
}

#[test]
fn test_geo_coins_wait_for_a_location() {
    let mut world = make_world(EngineConfig::new());
    let here = GeoPoint::new(40.4168, -3.7038);
    store::spawn_geo_collectibles(&mut world, &[here], 1);

    tick_collision_detector(&mut world);
    assert!(drain(&mut world).is_empty());

    world.resource_mut::<UserLocation>().0 = Some(here);
    tick_collision_detector(&mut world);
    assert_eq!(
        collected_ids(&drain(&mut world)),
        vec!["geo-coin-0".to_string()]
    );
}

#[test]
fn test_world_pose_never_collects_geo_coins() {
    let mut world = make_world(EngineConfig::new());
    world.spawn((Collectible::new("g", 0, 1), GeoPosition::new(0.0, 0.0)));
    tick_collision_detector(&mut world);
    assert!(drain(&mut world).is_empty());
    assert!(!world
        .query::<&Collectible>()
        .iter(&world)
        .any(|c| c.is_collected()));
}

#[test]
fn test_collection_releases_anchor() {
    let mut world = make_world(EngineConfig::new());
    let entity = world
        .spawn((
            Collectible::new("a", 0, 1),
            WorldPosition::new(0.0, 0.0, 0.0),
            Anchor(AnchorId("native-1".into())),
        ))
        .id();
    tick_collision_detector(&mut world);
    let outbox = world.resource_mut::<SessionOutbox>().take();
    assert_eq!(outbox.released_anchors, vec![AnchorId("native-1".into())]);
    assert!(world.get::<Anchor>(entity).is_none());
}

#[test]
fn test_pause_requested_on_milestone_when_configured() {
    let mut config = EngineConfig::new().with_milestone_interval(1);
    config.pause_on_milestone = true;
    let mut world = make_world(config);
    spawn_line(&mut world, 1);
    tick_collision_detector(&mut world);
    assert!(world.resource::<SessionOutbox>().pause_requested);
}

// ==================== RENDER ====================

#[test]
fn test_render_resizes_to_container_and_clears() {
    let mut world = make_world(EngineConfig::new());
    let surface = with_surface(&mut world, ScreenSize::new(320.0, 480.0));
    tick_render(&mut world);
    assert_eq!(surface.resize_count(), 1);
    surface.set_container_size(ScreenSize::new(480.0, 320.0));
    tick_render(&mut world);
    tick_render(&mut world);
    assert_eq!(surface.resize_count(), 2);
    assert_eq!(surface.clear_count(), 3);
}

#[test]
fn test_camera_background_falls_back_to_gradient() {
    let mut world = make_world(EngineConfig::new());
    let surface = with_surface(&mut world, ScreenSize::new(320.0, 480.0));
    tick_render(&mut world);
    assert!(matches!(
        surface.commands().first(),
        Some(DrawCommand::Gradient { .. })
    ));

    world.resource_mut::<ViewSettings>().camera_live = true;
    tick_render(&mut world);
    assert_eq!(surface.commands().first(), Some(&DrawCommand::VideoFrame));
}

#[test]
fn test_collected_and_behind_coins_are_not_drawn() {
    let mut world = make_world(EngineConfig::new());
    let surface = with_surface(&mut world, ScreenSize::new(320.0, 480.0));
    spawn_line(&mut world, 3);
    store::mark_collected(&mut world, "coin-1");
    move_to(&mut world, -1.0);
    tick_render(&mut world);

    // coin-0 is behind the viewer, coin-1 collected: only coin-2 draws a glyph.
    let glyphs = surface
        .commands()
        .iter()
        .filter(|c| matches!(c, DrawCommand::Text { .. }))
        .count();
    assert_eq!(glyphs, 1);
}

#[test]
fn test_map_view_draws_markers_and_user_dot() {
    let mut world = make_world(EngineConfig::new());
    let surface = with_surface(&mut world, ScreenSize::new(400.0, 400.0));
    world.resource_mut::<ViewSettings>().mode = ViewMode::Map;
    let here = GeoPoint::new(51.5, -0.12);
    world.resource_mut::<UserLocation>().0 = Some(here);
    store::add_marker(&mut world, MarkerSpec::new("cafe", here).with_title("Cafe"));
    tick_render(&mut world);

    let commands = surface.commands();
    assert!(matches!(commands[0], DrawCommand::Rect { .. }));
    assert!(commands.iter().any(
        |c| matches!(c, DrawCommand::Text { text, .. } if text == "Cafe")
    ));
    let user_dot = Color::rgb(0, 255, 0);
    let dot = commands.iter().find_map(|c| match c {
        DrawCommand::Circle {
            center,
            color,
            filled: true,
            ..
        } if *color == user_dot => Some(*center),
        _ => None,
    });
    let dot = dot.expect("user dot drawn");
    assert!(approx_eq(dot.x, 200.0));
    assert!(approx_eq(dot.y, 200.0));
}

// ==================== FULL FRAME ====================

#[test]
fn test_frame_schedule_draws_before_collecting() {
    let mut world = make_world(EngineConfig::new());
    let surface = with_surface(&mut world, ScreenSize::new(320.0, 480.0));
    spawn_line(&mut world, 1);
    world.resource_mut::<UserPose>().0 = WorldPoint::new(0.0, 0.0, -0.1);
    store::upsert_route(
        &mut world,
        Route::world(
            "path",
            vec![WorldPoint::new(0.0, 0.0, -1.0), WorldPoint::new(0.0, 0.0, -5.0)],
            0.5,
            Color::WHITE,
        ),
    );

    let mut schedule = frame_schedule();
    update_world_time(&mut world, 0.0);
    schedule.run(&mut world);

    // The coin at z=0 is behind the viewer, but it is still collected this tick.
    assert_eq!(collected_ids(&drain(&mut world)), vec!["coin-0".to_string()]);
    assert!(surface
        .commands()
        .iter()
        .any(|c| matches!(c, DrawCommand::Polyline { .. })));
}
