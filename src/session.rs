//! Session controller.
//!
//! A [`Session`] is one engine instance, owned by the screen that shows it
//! and dropped with it. It composes the entity store (its own
//! [`World`]), the position trackers, the frame schedule and the host
//! collaborators handed over in a [`SessionHost`], and it owns the
//! lifecycle:
//!
//! ```text
//! new -> Idle --initialize--> Initializing --> Active <--pause/resume--> Paused
//!                                  |              \                     /
//!                        surface failure           `------ stop -------'
//!                                  v                          |
//!                                 Idle                     Stopped
//! ```
//!
//! Everything happens on the thread that owns the session. Position sources
//! and the reporter may use their own threads but only talk to the session
//! through channels that are drained here.

use std::cell::RefCell;
use std::rc::Rc;

use bevy_ecs::prelude::*;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::bridge::{AnchorId, ArBridge, ArSessionOptions, BridgePoseSource, SharedBridge, share};
use crate::components::collectible::{CollectibleInfo, CollectiblePlacement};
use crate::components::geoposition::GeoPoint;
use crate::components::marker::MarkerSpec;
use crate::components::route::{AR_PATH_ID, Route};
use crate::components::screenposition::{ScreenPoint, ScreenSize};
use crate::components::worldposition::WorldPoint;
use crate::errors::{EngineError, ResourceUnavailable};
use crate::events::collection::{observe_coin_collected, observe_milestone_reached};
use crate::events::session::{Advisory, SessionEvent, SubscriptionId};
use crate::projection::MapBounds;
use crate::renderloop::{FrameHost, FrameToken, RenderLoop};
use crate::reporting::{SessionReporter, SessionSummary, SummaryStatus, now_millis};
use crate::resources::engineconfig::EngineConfig;
use crate::resources::entityindex::EntityIndex;
use crate::resources::outbox::SessionOutbox;
use crate::resources::reference::{TrackingStatus, UserLocation, UserPose};
use crate::resources::sessionstate::{SessionState, SessionStates};
use crate::resources::stats::{CollectionStats, SessionStats};
use crate::resources::surface::{Color, Surface, SurfaceProvider};
use crate::resources::view::{ViewMode, ViewSettings};
use crate::resources::worldtime::WorldTime;
use crate::sensors::CameraDevice;
use crate::store::{self, SpawnPattern};
use crate::systems::collision::record_collection;
use crate::systems::frame_schedule;
use crate::systems::render::surface_size;
use crate::systems::time::update_world_time;
use crate::systems::tracking::apply_position_fix;
use crate::tracker::{
    Position, PositionFix, PositionSource, PositionTracker, StartOutcome, UpdateCallback,
};

/// Per-session feature flags. Each sensor is optional and independently
/// failable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub enable_camera: bool,
    pub enable_location: bool,
    pub enable_plane_detection: bool,
    pub enable_hit_testing: bool,
    pub view: ViewMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            enable_camera: true,
            enable_location: true,
            enable_plane_detection: true,
            enable_hit_testing: true,
            view: ViewMode::Camera,
        }
    }
}

impl SessionOptions {
    /// AR camera view with every sensor requested.
    pub fn ar() -> Self {
        Self::default()
    }

    /// Map view: location only.
    pub fn map() -> Self {
        Self {
            enable_camera: false,
            enable_plane_detection: false,
            enable_hit_testing: false,
            view: ViewMode::Map,
            ..Self::default()
        }
    }

    pub fn with_camera(mut self, enabled: bool) -> Self {
        self.enable_camera = enabled;
        self
    }

    pub fn with_location(mut self, enabled: bool) -> Self {
        self.enable_location = enabled;
        self
    }

    pub fn with_hit_testing(mut self, enabled: bool) -> Self {
        self.enable_hit_testing = enabled;
        self
    }
}

/// Host-side collaborators of a session.
pub struct SessionHost {
    surfaces: Box<dyn SurfaceProvider>,
    frames: Box<dyn FrameHost>,
    camera: Option<Box<dyn CameraDevice>>,
    location: Option<Box<dyn PositionSource>>,
    bridge: Option<Box<dyn ArBridge>>,
    reporter: Option<SessionReporter>,
}

impl SessionHost {
    pub fn new(surfaces: impl SurfaceProvider + 'static, frames: impl FrameHost + 'static) -> Self {
        Self {
            surfaces: Box::new(surfaces),
            frames: Box::new(frames),
            camera: None,
            location: None,
            bridge: None,
            reporter: None,
        }
    }

    pub fn with_camera(mut self, camera: impl CameraDevice + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    pub fn with_location_source(mut self, source: impl PositionSource + 'static) -> Self {
        self.location = Some(Box::new(source));
        self
    }

    pub fn with_bridge(mut self, bridge: impl ArBridge + 'static) -> Self {
        self.bridge = Some(Box::new(bridge));
        self
    }

    pub fn with_reporter(mut self, reporter: SessionReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }
}

pub type Listener = Box<dyn FnMut(&SessionEvent)>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Subscribers {
    fn publish(&mut self, event: &SessionEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

/// Result of a screen-space hit test against the ground plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HitTestResult {
    pub hit: bool,
    /// World-space hit point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<WorldPoint>,
    /// Metres from the viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

/// One engine instance.
pub struct Session {
    world: World,
    schedule: Schedule,
    render_loop: RenderLoop,
    frames: Box<dyn FrameHost>,
    surfaces: Box<dyn SurfaceProvider>,
    camera: Option<Box<dyn CameraDevice>>,
    location_source: Option<Box<dyn PositionSource>>,
    location_tracker: PositionTracker,
    pose_tracker: PositionTracker,
    bridge: Option<SharedBridge>,
    bridge_live: bool,
    reporter: Option<SessionReporter>,
    subscribers: Rc<RefCell<Subscribers>>,
    advisories: Vec<Advisory>,
    options: SessionOptions,
    rng: fastrand::Rng,
}

impl Session {
    pub fn new(config: EngineConfig, host: SessionHost) -> Self {
        let rng = match config.spawn_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(SessionState::new());
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
        // Observers must be registered before the first trigger.
        world.flush();

        Self {
            world,
            schedule: frame_schedule(),
            render_loop: RenderLoop::new(),
            frames: host.frames,
            surfaces: host.surfaces,
            camera: host.camera,
            location_source: host.location,
            location_tracker: PositionTracker::new(),
            pose_tracker: PositionTracker::new(),
            bridge: host.bridge.map(share),
            bridge_live: false,
            reporter: host.reporter,
            subscribers: Rc::new(RefCell::new(Subscribers::default())),
            advisories: Vec::new(),
            options: SessionOptions::default(),
            rng,
        }
    }

    pub fn state(&self) -> SessionStates {
        self.world.resource::<SessionState>().get()
    }

    pub fn config(&self) -> &EngineConfig {
        self.world.resource::<EngineConfig>()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Read access to the session's world, for inspection.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Register a listener for every [`SessionEvent`].
    ///
    /// Listeners run on the session's thread, after the command or frame that
    /// produced the event.
    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        let mut subs = self.subscribers.borrow_mut();
        subs.next_id += 1;
        let id = SubscriptionId(subs.next_id);
        subs.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.borrow_mut();
        let before = subs.listeners.len();
        subs.listeners.retain(|(sid, _)| *sid != id);
        subs.listeners.len() != before
    }

    fn set_state(&mut self, to: SessionStates) -> Result<(), EngineError> {
        let from = self
            .world
            .resource_mut::<SessionState>()
            .transition(to)?;
        self.world
            .resource_mut::<SessionOutbox>()
            .push(SessionEvent::StateChanged { from, to });
        Ok(())
    }

    fn require_running(&self) -> Result<(), EngineError> {
        let state = self.state();
        if state.is_running() {
            Ok(())
        } else {
            Err(EngineError::NotRunning { state })
        }
    }

    fn degrade(&mut self, reason: ResourceUnavailable) {
        warn!("Degraded mode: {}", reason);
        let advisory = Advisory::from(reason);
        self.advisories.push(advisory.clone());
        self.world.resource_mut::<SessionOutbox>().push(advisory);
    }

    /// Acquire resources and start the session.
    ///
    /// Only a drawing surface that cannot be created fails this call; the
    /// session then goes back to `Idle`. Camera, location and native AR
    /// failures are turned into advisories and the session still becomes
    /// Active with those features off.
    pub fn initialize(&mut self, options: SessionOptions) -> Result<(), EngineError> {
        self.set_state(SessionStates::Initializing)?;
        self.flush();
        self.options = options;

        let surface = match self.surfaces.create_surface() {
            Ok(surface) => surface,
            Err(reason) => {
                error!("Drawing surface could not be created: {}", reason);
                self.set_state(SessionStates::Idle)?;
                self.flush();
                return Err(EngineError::InitializationFailure(reason));
            }
        };
        self.world.insert_non_send_resource(Surface(surface));

        {
            let mut view = self.world.resource_mut::<ViewSettings>();
            view.mode = options.view;
            view.hit_testing = options.enable_hit_testing;
        }

        if options.enable_camera && options.view == ViewMode::Camera {
            self.start_native_ar(options);
            if !self.bridge_live {
                self.acquire_camera();
            }
        }
        if options.enable_location {
            self.start_location();
        }

        self.set_state(SessionStates::Active)?;
        self.report(SummaryStatus::Started);
        self.render_loop.schedule(self.frames.as_mut());
        self.flush();
        Ok(())
    }

    fn start_native_ar(&mut self, options: SessionOptions) {
        let Some(bridge) = self.bridge.clone() else {
            return;
        };
        if !bridge.borrow().is_supported() {
            self.degrade(ResourceUnavailable::NativeAr("AR not supported".into()));
            self.bridge = None;
            return;
        }
        let started = {
            let mut b = bridge.borrow_mut();
            b.attach_view().and_then(|()| {
                b.start_session(ArSessionOptions {
                    plane_detection: options.enable_plane_detection,
                    hit_testing: options.enable_hit_testing,
                })
            })
        };
        if let Err(e) = started {
            bridge.borrow_mut().detach_view();
            self.degrade(ResourceUnavailable::NativeAr(e.to_string()));
            self.bridge = None;
            return;
        }

        let source = Box::new(BridgePoseSource::new(bridge.clone()));
        let callback = self.position_callback();
        let timeout = self.config().fix_timeout;
        match self.pose_tracker.start(source, callback, timeout) {
            Ok(outcome) => {
                info!("Native AR session started");
                self.bridge_live = true;
                self.world.resource_mut::<ViewSettings>().camera_live = true;
                self.world.resource_mut::<TrackingStatus>().tracking = true;
                self.after_tracker_start(outcome, true);
            }
            Err(e) => {
                let mut b = bridge.borrow_mut();
                b.stop_session();
                b.detach_view();
                drop(b);
                self.degrade(ResourceUnavailable::NativeAr(e.to_string()));
                self.bridge = None;
            }
        }
    }

    fn acquire_camera(&mut self) {
        let result = match self.camera.as_mut() {
            Some(camera) => camera.acquire(),
            None => Err(ResourceUnavailable::Camera("no camera device".into())),
        };
        match result {
            Ok(()) => {
                info!("Camera stream acquired");
                self.world.resource_mut::<ViewSettings>().camera_live = true;
            }
            Err(e) => self.degrade(e),
        }
    }

    fn start_location(&mut self) {
        let Some(source) = self.location_source.take() else {
            self.degrade(ResourceUnavailable::Location("no location source".into()));
            return;
        };
        let callback = self.position_callback();
        let timeout = self.config().fix_timeout;
        match self.location_tracker.start(source, callback, timeout) {
            Ok(outcome) => {
                self.world.resource_mut::<TrackingStatus>().tracking = true;
                self.after_tracker_start(outcome, false);
            }
            Err(e) => self.degrade(ResourceUnavailable::Location(e.to_string())),
        }
    }

    fn after_tracker_start(&mut self, outcome: StartOutcome, pose: bool) {
        let tracker = if pose {
            &self.pose_tracker
        } else {
            &self.location_tracker
        };
        match (outcome, tracker.current()) {
            (StartOutcome::Fixed, Some(fix)) => apply_position_fix(&mut self.world, fix),
            _ => {
                let waited_ms = self.config().fix_timeout.as_millis() as u64;
                let advisory = Advisory::FixTimeout { waited_ms };
                self.advisories.push(advisory.clone());
                self.world.resource_mut::<SessionOutbox>().push(advisory);
            }
        }
    }

    /// Republishes every accepted fix to subscribers.
    fn position_callback(&self) -> UpdateCallback {
        let subscribers = self.subscribers.clone();
        Box::new(move |fix: &PositionFix| {
            let event = match fix.position {
                Position::World(position) => SessionEvent::PoseUpdated { position },
                Position::Geo(location) => SessionEvent::LocationUpdated { location },
            };
            subscribers.borrow_mut().publish(&event);
        })
    }

    /// Deliver queued events, release anchors and apply a requested pause.
    fn flush(&mut self) {
        let outbox = self.world.resource_mut::<SessionOutbox>().take();
        if let Some(bridge) = &self.bridge {
            for anchor in &outbox.released_anchors {
                if let Err(e) = bridge.borrow_mut().remove_anchor(anchor) {
                    warn!("Could not remove anchor {:?}: {}", anchor, e);
                }
            }
        }
        {
            let mut subs = self.subscribers.borrow_mut();
            for event in &outbox.events {
                subs.publish(event);
            }
        }
        if outbox.pause_requested && self.state() == SessionStates::Active {
            info!("Pausing for milestone");
            if let Err(e) = self.pause() {
                warn!("Milestone pause failed: {}", e);
            }
        }
    }

    fn report(&mut self, status: SummaryStatus) {
        let Some(reporter) = self.reporter.as_ref() else {
            debug!("No reporter, {:?} summary skipped", status);
            return;
        };
        let stats = self.stats();
        reporter.submit(SessionSummary {
            user_id: self.config().user_id.clone(),
            status,
            coins_collected: stats.coins_collected,
            distance: stats.distance,
            energy: stats.energy,
            duration: stats.duration,
            timestamp: now_millis(),
        });
    }

    /// Drain pending fixes from the trackers into the world.
    ///
    /// Runs at the top of every frame; hosts may call it while paused to keep
    /// the reference position current.
    pub fn update_position(&mut self) {
        if !self.state().is_running() {
            return;
        }
        if let Some(fix) = self.pose_tracker.poll() {
            apply_position_fix(&mut self.world, fix);
        }
        if let Some(fix) = self.location_tracker.poll() {
            apply_position_fix(&mut self.world, fix);
        }
    }

    /// Run the frame the host is calling back for.
    ///
    /// `now` is the host's frame timestamp in seconds. Returns `false` when
    /// the frame is refused: a token that is not the pending one, or a
    /// session that is not Active.
    pub fn run_frame(&mut self, token: FrameToken, now: f64) -> bool {
        if !self.render_loop.accept(token) {
            return false;
        }
        if self.state() != SessionStates::Active {
            return false;
        }

        let resumed = self.world.resource::<WorldTime>().resync;
        update_world_time(&mut self.world, now);
        if resumed {
            // Silence while paused is not a tracking gap.
            let elapsed = self.world.resource::<WorldTime>().elapsed;
            let mut status = self.world.resource_mut::<TrackingStatus>();
            if status.last_fix_at.is_some() {
                status.last_fix_at = Some(elapsed);
            }
        }
        self.update_position();
        self.schedule.run(&mut self.world);
        self.world.clear_trackers();
        self.flush();

        if self.state() == SessionStates::Active {
            self.render_loop.schedule(self.frames.as_mut());
        }
        true
    }

    /// Suspend rendering and collection. Position tracking keeps running.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.set_state(SessionStates::Paused)?;
        self.render_loop.cancel(self.frames.as_mut());
        self.flush();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.set_state(SessionStates::Active)?;
        self.world.resource_mut::<WorldTime>().mark_resync();
        self.render_loop.schedule(self.frames.as_mut());
        self.flush();
        Ok(())
    }

    /// Tear the session down. Calling it again is a no-op.
    ///
    /// The state flips to `Stopped` before anything is released, so frames
    /// and fixes that arrive later are refused.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if self.state() == SessionStates::Stopped {
            return Ok(());
        }
        self.set_state(SessionStates::Stopped)?;

        self.render_loop.cancel(self.frames.as_mut());
        self.pose_tracker.stop();
        self.location_tracker.stop();
        self.world.resource_mut::<TrackingStatus>().tracking = false;

        if let Some(camera) = self.camera.as_mut()
            && camera.is_streaming()
        {
            camera.release();
            info!("Camera stream released");
        }
        self.world.resource_mut::<ViewSettings>().camera_live = false;

        let anchors = store::clear(&mut self.world);
        if let Some(bridge) = self.bridge.take() {
            let mut b = bridge.borrow_mut();
            for anchor in &anchors {
                if let Err(e) = b.remove_anchor(anchor) {
                    warn!("Could not remove anchor {:?}: {}", anchor, e);
                }
            }
            if self.bridge_live {
                b.stop_session();
                b.detach_view();
                info!("Native AR session stopped");
            }
        }
        self.bridge_live = false;
        self.world.remove_non_send_resource::<Surface>();

        self.report(SummaryStatus::Ended);
        self.flush();
        Ok(())
    }

    /// Advisories raised so far, oldest first.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn stats(&self) -> SessionStats {
        let stats = self.world.resource::<CollectionStats>();
        let time = self.world.resource::<WorldTime>();
        SessionStats {
            coins_collected: stats.collected,
            score: stats.score,
            energy: stats.energy_kwh,
            distance: stats.distance_m,
            duration: f64::from(time.active),
        }
    }

    pub fn user_position(&self) -> WorldPoint {
        self.world.resource::<UserPose>().0
    }

    pub fn user_location(&self) -> Option<GeoPoint> {
        self.world.resource::<UserLocation>().0
    }

    /// Live location, or the configured fallback in degraded mode.
    pub fn reference_location(&self) -> GeoPoint {
        self.user_location()
            .unwrap_or(self.config().fallback_location)
    }

    pub fn surface_size(&self) -> Option<ScreenSize> {
        surface_size(&self.world)
    }

    pub fn reporter(&self) -> Option<&SessionReporter> {
        self.reporter.as_ref()
    }

    /// Move the world reference position directly.
    pub fn set_reference_position(&mut self, position: WorldPoint) -> Result<(), EngineError> {
        self.require_running()?;
        apply_position_fix(&mut self.world, PositionFix::world(position, now_millis()));
        self.world
            .resource_mut::<SessionOutbox>()
            .push(SessionEvent::PoseUpdated { position });
        self.flush();
        Ok(())
    }

    /// Move the geo reference location directly.
    pub fn set_reference_location(&mut self, location: GeoPoint) -> Result<(), EngineError> {
        self.require_running()?;
        apply_position_fix(&mut self.world, PositionFix::geo(location, now_millis()));
        self.world
            .resource_mut::<SessionOutbox>()
            .push(SessionEvent::LocationUpdated { location });
        self.flush();
        Ok(())
    }

    /// Spawn `count` world collectibles `spacing` metres apart along -z with
    /// up to `jitter` metres of lateral offset. Replaces any existing batch.
    pub fn spawn_collectibles(
        &mut self,
        count: u32,
        spacing: f32,
        jitter: f32,
    ) -> Result<Vec<CollectibleInfo>, EngineError> {
        let pattern = SpawnPattern {
            count,
            spacing,
            jitter,
            ..self.config().spawn
        };
        self.spawn_pattern(&pattern)
    }

    pub fn spawn_pattern(
        &mut self,
        pattern: &SpawnPattern,
    ) -> Result<Vec<CollectibleInfo>, EngineError> {
        self.require_running()?;
        let (spawned, released) = store::spawn_collectibles(&mut self.world, pattern, &mut self.rng);
        self.release_anchors(&released);
        if self.bridge_live {
            self.anchor_collectibles(&spawned);
        }
        info!("Spawned {} collectibles", spawned.len());
        Ok(spawned)
    }

    /// Spawn collectibles at geo locations. Replaces any existing batch.
    pub fn spawn_geo_collectibles(
        &mut self,
        locations: &[GeoPoint],
    ) -> Result<Vec<CollectibleInfo>, EngineError> {
        self.require_running()?;
        let value = self.config().spawn.value;
        let (spawned, released) = store::spawn_geo_collectibles(&mut self.world, locations, value);
        self.release_anchors(&released);
        info!("Spawned {} geo collectibles", spawned.len());
        Ok(spawned)
    }

    fn anchor_collectibles(&mut self, spawned: &[CollectibleInfo]) {
        let Some(bridge) = self.bridge.clone() else {
            return;
        };
        for info in spawned {
            let CollectiblePlacement::World(pos) = info.placement else {
                continue;
            };
            match bridge.borrow_mut().add_anchor(pos) {
                Ok(anchor) => {
                    store::attach_anchor(&mut self.world, &info.id, anchor);
                }
                Err(e) => warn!("Could not anchor '{}': {}", info.id, e),
            }
        }
    }

    fn release_anchors(&mut self, anchors: &[AnchorId]) {
        let Some(bridge) = &self.bridge else {
            return;
        };
        for anchor in anchors {
            if let Err(e) = bridge.borrow_mut().remove_anchor(anchor) {
                warn!("Could not remove anchor {:?}: {}", anchor, e);
            }
        }
    }

    /// Collect `id` without proximity. Returns `false` for unknown or
    /// already collected ids.
    pub fn mark_collected(&mut self, id: &str) -> Result<bool, EngineError> {
        self.require_running()?;
        let Some((entity, info)) = store::mark_collected(&mut self.world, id) else {
            return Ok(false);
        };
        record_collection(&mut self.world, entity, info);
        self.flush();
        Ok(true)
    }

    /// Remove a collected collectible.
    pub fn remove_collectible(&mut self, id: &str) -> Result<bool, EngineError> {
        self.require_running()?;
        Ok(store::remove_collectible(&mut self.world, id))
    }

    pub fn collectibles(&self) -> Vec<CollectibleInfo> {
        store::collectibles(&self.world)
    }

    /// Replace the AR walking path.
    pub fn set_path(
        &mut self,
        points: Vec<WorldPoint>,
        width: f32,
        color: Color,
    ) -> Result<(), EngineError> {
        self.upsert_route(Route::world(AR_PATH_ID, points, width, color))
    }

    pub fn upsert_route(&mut self, route: Route) -> Result<(), EngineError> {
        self.require_running()?;
        debug!("Route '{}' set ({} points)", route.id, route.geometry.len());
        store::upsert_route(&mut self.world, route);
        Ok(())
    }

    pub fn remove_route(&mut self, id: &str) -> Result<bool, EngineError> {
        self.require_running()?;
        Ok(store::remove_route(&mut self.world, id))
    }

    pub fn clear_routes(&mut self) -> Result<(), EngineError> {
        self.require_running()?;
        store::clear_routes(&mut self.world);
        Ok(())
    }

    pub fn route(&self, id: &str) -> Option<Route> {
        store::route(&self.world, id)
    }

    pub fn add_marker(&mut self, marker: MarkerSpec) -> Result<(), EngineError> {
        self.require_running()?;
        store::add_marker(&mut self.world, marker);
        Ok(())
    }

    pub fn remove_marker(&mut self, id: &str) -> Result<bool, EngineError> {
        self.require_running()?;
        Ok(store::remove_marker(&mut self.world, id))
    }

    pub fn clear_markers(&mut self) -> Result<(), EngineError> {
        self.require_running()?;
        store::clear_markers(&mut self.world);
        Ok(())
    }

    pub fn markers(&self) -> Vec<MarkerSpec> {
        store::markers(&self.world)
    }

    /// Metres from the live location to marker `id`; `None` without a fix or
    /// for an unknown marker.
    pub fn distance_to_marker(&self, id: &str) -> Option<f64> {
        let here = self.user_location()?;
        let there = store::marker_position(&self.world, id)?;
        Some(here.distance_meters(&there))
    }

    fn current_surface_size(&self) -> Result<ScreenSize, EngineError> {
        self.require_running()?;
        self.surface_size().ok_or(EngineError::NotRunning {
            state: self.state(),
        })
    }

    /// Convert a tap on the map into a location and publish `MapTapped`.
    pub fn tap_map(&mut self, screen: ScreenPoint) -> Result<GeoPoint, EngineError> {
        let size = self.current_surface_size()?;
        let origin = self.reference_location();
        let location = self
            .config()
            .projection()
            .screen_to_geo(screen, &origin, size);
        self.world
            .resource_mut::<SessionOutbox>()
            .push(SessionEvent::MapTapped { location, screen });
        self.flush();
        Ok(location)
    }

    /// Geographic rectangle currently visible on the map.
    pub fn map_bounds(&self) -> Result<MapBounds, EngineError> {
        let size = self.current_surface_size()?;
        Ok(self
            .config()
            .projection()
            .map_bounds(&self.reference_location(), size))
    }

    /// Cast the screen point onto the ground plane.
    ///
    /// Misses when hit testing is disabled for the session.
    pub fn hit_test(&self, screen: ScreenPoint) -> Result<HitTestResult, EngineError> {
        let size = self.current_surface_size()?;
        if !self.world.resource::<ViewSettings>().hit_testing {
            return Ok(HitTestResult::default());
        }
        let config = self.config();
        let hit = config
            .projection()
            .screen_to_ground(screen, size, config.hit_test_plane_y);
        Ok(match hit {
            Some(relative) => HitTestResult {
                hit: true,
                position: Some(relative + self.user_position()),
                distance: Some(relative.length()),
            },
            None => HitTestResult::default(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state().is_running()
            && let Err(e) = self.stop()
        {
            warn!("Session teardown failed: {}", e);
        }
    }
}
