//! Render systems.
//!
//! One frame paints, in order: [`render_prepare`] (resize to the container,
//! clear), [`render_background`] (camera passthrough, gradient fallback or
//! map grid), [`render_routes`] and [`render_entities`]. They are chained in
//! the frame schedule ahead of the collision detector and are the only code
//! that touches the non-send [`Surface`].
//!
//! Nothing here stores a screen coordinate: every position is projected
//! from its world or geo point against the current reference position on
//! every frame.
use bevy_ecs::prelude::*;
use smallvec::SmallVec;

use crate::components::collectible::Collectible;
use crate::components::geoposition::{GeoPoint, GeoPosition};
use crate::components::marker::Marker;
use crate::components::route::{Route, RouteGeometry};
use crate::components::screenposition::{ScreenPoint, ScreenSize};
use crate::components::worldposition::WorldPosition;
use crate::resources::engineconfig::EngineConfig;
use crate::resources::reference::{UserLocation, UserPose};
use crate::resources::surface::{Color, DrawingSurface, Surface};
use crate::resources::view::{ViewMode, ViewSettings};
use crate::resources::worldtime::WorldTime;

pub const MAP_GRID_SIZE: f32 = 50.0;
const MAP_BACKGROUND: Color = Color::rgb(0xf0, 0xf0, 0xf0);
const MAP_GRID: Color = Color::rgb(0xe0, 0xe0, 0xe0);
const FALLBACK_TOP: Color = Color::rgb(0x11, 0x18, 0x27);
const FALLBACK_BOTTOM: Color = Color::rgb(0x1f, 0x29, 0x37);

const COIN_GLOW_RADIUS: f32 = 25.0;
const COIN_RADIUS: f32 = 15.0;
const COIN_GLOW: Color = Color::rgba(255, 215, 0, 77);
const COIN_BODY: Color = Color::rgb(0xff, 0xd7, 0x00);
const COIN_BORDER: Color = Color::rgb(0xff, 0x8c, 0x00);
const COIN_GLYPH: &str = "\u{26a1}";

const PATH_ARROWS: usize = 5;
const PIN_RADIUS: f32 = 8.0;
const PIN_LIFT: f32 = 10.0;
const TITLE_COLOR: Color = Color::rgb(0x33, 0x33, 0x33);
const USER_DOT: Color = Color::rgb(0, 255, 0);

/// `1 + amplitude * sin(frequency * t + phase)`.
pub fn pulse_scale(t: f32, phase: f32, amplitude: f32, frequency: f32) -> f32 {
    1.0 + amplitude * (frequency * t + phase).sin()
}

/// Radius of the user-location halo on the map.
pub fn user_halo_radius(t: f32) -> f32 {
    15.0 + 5.0 * (3.0 * t).sin()
}

/// Map centre: the live location, or the configured fallback in degraded mode.
fn map_origin(location: &UserLocation, config: &EngineConfig) -> GeoPoint {
    location.0.unwrap_or(config.fallback_location)
}

/// Step 1-2: match the container size and wipe the previous frame.
pub fn render_prepare(mut surface: NonSendMut<Surface>) {
    let container = surface.0.container_size();
    surface.0.resize(container);
    surface.0.clear();
}

/// Step 3: background layer.
pub fn render_background(mut surface: NonSendMut<Surface>, view: Res<ViewSettings>) {
    let surface = surface.0.as_mut();
    match view.mode {
        ViewMode::Camera if view.camera_live => surface.draw_video_frame(),
        ViewMode::Camera => surface.fill_vertical_gradient(FALLBACK_TOP, FALLBACK_BOTTOM),
        ViewMode::Map => draw_map_grid(surface),
    }
}

fn draw_map_grid(surface: &mut dyn DrawingSurface) {
    let size = surface.size();
    surface.fill_rect(ScreenPoint::new(0.0, 0.0), size, MAP_BACKGROUND);
    let mut x = 0.0;
    while x <= size.width {
        surface.stroke_polyline(
            &[ScreenPoint::new(x, 0.0), ScreenPoint::new(x, size.height)],
            1.0,
            MAP_GRID,
        );
        x += MAP_GRID_SIZE;
    }
    let mut y = 0.0;
    while y <= size.height {
        surface.stroke_polyline(
            &[ScreenPoint::new(0.0, y), ScreenPoint::new(size.width, y)],
            1.0,
            MAP_GRID,
        );
        y += MAP_GRID_SIZE;
    }
}

/// Step 4: path and route geometry.
///
/// Camera view draws world paths (with forward arrows); map view draws geo
/// routes. Routes with fewer than two points are skipped.
pub fn render_routes(
    mut surface: NonSendMut<Surface>,
    view: Res<ViewSettings>,
    config: Res<EngineConfig>,
    pose: Res<UserPose>,
    location: Res<UserLocation>,
    routes: Query<&Route>,
) {
    let surface = surface.0.as_mut();
    let size = surface.size();
    let projection = config.projection();
    let origin = map_origin(&location, &config);

    let mut ordered: Vec<&Route> = routes.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    for route in ordered {
        match (&route.geometry, view.mode) {
            (RouteGeometry::World(points), ViewMode::Camera) if points.len() >= 2 => {
                let projected: SmallVec<[ScreenPoint; 16]> = points
                    .iter()
                    .map(|p| projection.world_to_screen(*p - pose.0, size))
                    .collect();
                let near = points[0] - pose.0;
                let width = route.style.width * projection.perspective_scale(near.z);
                surface.stroke_polyline(&projected, width, route.style.color);
                draw_path_arrows(surface, &projected);
            }
            (RouteGeometry::Geo(points), ViewMode::Map) if points.len() >= 2 => {
                let projected: SmallVec<[ScreenPoint; 16]> = points
                    .iter()
                    .map(|p| projection.geo_to_screen(p, &origin, size))
                    .collect();
                surface.stroke_polyline(&projected, route.style.width, route.style.color);
            }
            _ => {}
        }
    }
}

fn draw_path_arrows(surface: &mut dyn DrawingSurface, projected: &[ScreenPoint]) {
    for at in projected.iter().take(projected.len() - 1).take(PATH_ARROWS) {
        surface.fill_polygon(
            &[
                at.translate(0.0, -10.0),
                at.translate(-8.0, 5.0),
                at.translate(8.0, 5.0),
            ],
            Color::WHITE,
        );
    }
}

/// Step 5: uncollected collectibles, markers and the user dot, pulsing.
///
/// World coins are drawn far to near and hidden once behind the viewer.
/// World coins pulse with their depth as phase, geo coins with their spawn
/// index.
#[allow(clippy::too_many_arguments)]
pub fn render_entities(
    mut surface: NonSendMut<Surface>,
    view: Res<ViewSettings>,
    config: Res<EngineConfig>,
    time: Res<WorldTime>,
    pose: Res<UserPose>,
    location: Res<UserLocation>,
    world_coins: Query<(&Collectible, &WorldPosition)>,
    geo_coins: Query<(&Collectible, &GeoPosition)>,
    markers: Query<(&Marker, &GeoPosition)>,
) {
    let surface = surface.0.as_mut();
    let size = surface.size();
    let projection = config.projection();
    let t = time.elapsed;
    let pulse = |phase: f32| pulse_scale(t, phase, config.pulse_amplitude, config.pulse_frequency);

    match view.mode {
        ViewMode::Camera => {
            let mut coins: Vec<(ScreenPoint, f32, f32)> = world_coins
                .iter()
                .filter(|(c, _)| !c.is_collected())
                .filter_map(|(_, wp)| {
                    let rel = wp.pos - pose.0;
                    if rel.z > 0.0 {
                        return None;
                    }
                    Some((projection.world_to_screen(rel, size), rel.z, wp.pos.z))
                })
                .collect();
            coins.sort_by(|a, b| a.1.total_cmp(&b.1));
            for (at, _, z) in coins {
                draw_coin(surface, at, pulse(z));
            }
        }
        ViewMode::Map => {
            let origin = map_origin(&location, &config);
            let mut coins: Vec<(u32, ScreenPoint)> = geo_coins
                .iter()
                .filter(|(c, _)| !c.is_collected())
                .map(|(c, gp)| (c.index, projection.geo_to_screen(&gp.pos, &origin, size)))
                .collect();
            coins.sort_by_key(|(i, _)| *i);
            for (index, at) in coins {
                draw_coin(surface, at, pulse(index as f32));
            }

            let mut pins: Vec<(&Marker, ScreenPoint)> = markers
                .iter()
                .map(|(m, gp)| (m, projection.geo_to_screen(&gp.pos, &origin, size)))
                .collect();
            pins.sort_by(|a, b| a.0.id.cmp(&b.0.id));
            for (marker, at) in pins {
                draw_pin(surface, marker, at);
            }

            if let Some(here) = location.0 {
                let at = projection.geo_to_screen(&here, &origin, size);
                surface.fill_circle(at, user_halo_radius(t), USER_DOT.with_alpha(0.3));
                surface.fill_circle(at, PIN_RADIUS, USER_DOT);
                surface.stroke_circle(at, PIN_RADIUS, 2.0, Color::WHITE);
            }
        }
    }
}

fn draw_coin(surface: &mut dyn DrawingSurface, at: ScreenPoint, scale: f32) {
    surface.fill_circle(at, COIN_GLOW_RADIUS * scale, COIN_GLOW);
    surface.fill_circle(at, COIN_RADIUS * scale, COIN_BODY);
    surface.stroke_circle(at, COIN_RADIUS * scale, 2.0, COIN_BORDER);
    surface.draw_text(COIN_GLYPH, at.translate(0.0, 5.0), 14.0, Color::WHITE);
}

fn draw_pin(surface: &mut dyn DrawingSurface, marker: &Marker, at: ScreenPoint) {
    let color = marker.pin_color();
    let head = at.translate(0.0, -PIN_LIFT);
    surface.fill_circle(head, PIN_RADIUS, color);
    surface.stroke_circle(head, PIN_RADIUS, 2.0, Color::WHITE);
    surface.fill_polygon(
        &[at, at.translate(-6.0, -PIN_LIFT), at.translate(6.0, -PIN_LIFT)],
        color,
    );
    if let Some(title) = &marker.title {
        surface.draw_text(title, at.translate(0.0, 20.0), 12.0, TITLE_COLOR);
    }
}

/// Size the map would be drawn at right now.
pub fn surface_size(world: &World) -> Option<ScreenSize> {
    world
        .get_non_send_resource::<Surface>()
        .map(|s| s.0.size())
}
