//! Simulated devices.
//!
//! Stand-ins for the host collaborators of a session, used by the headless
//! demo and by the tests. Each one hands out a cloneable handle so the
//! caller can keep driving or inspecting it after the session has taken
//! ownership.
//!
//! - [`ScriptedSource`] – position source fed by hand through [`ScriptedSource::push`]
//! - [`WalkSource`] – background thread walking a straight line at a fixed cadence
//! - [`SilentSource`] – accepts every request and never delivers
//! - [`DeniedSource`] – refuses every request, like a denied permission
//! - [`FakeCamera`] – camera stream that can be told to refuse
//! - [`FakeBridge`] – native AR bridge recording anchors, driven by [`FakeBridge::emit_frame`]

use std::cell::RefCell;
use std::rc::Rc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, info};

use crate::bridge::{
    AnchorId, ArBridge, ArFrame, ArSessionOptions, CameraPose, FrameCallback, FrameSubscription,
};
use crate::components::geoposition::{GeoPoint, METERS_PER_DEGREE_LAT, meters_per_degree_lon};
use crate::components::worldposition::WorldPoint;
use crate::errors::{BridgeError, ResourceUnavailable, TrackerError};
use crate::sensors::CameraDevice;
use crate::tracker::{PositionFix, PositionSource, WatchId};

#[derive(Default)]
struct ScriptState {
    initial: Option<PositionFix>,
    watcher: Option<Sender<PositionFix>>,
    watches: u64,
    cleared: u32,
}

/// Position source driven by the caller.
///
/// The one-shot request is answered right away with the initial fix, if one
/// was given; otherwise it never resolves. Fixes pushed while the watch is
/// active are delivered; pushes before or after it are dropped.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    state: Rc<RefCell<ScriptState>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(fix: PositionFix) -> Self {
        let source = Self::default();
        source.state.borrow_mut().initial = Some(fix);
        source
    }

    /// Deliver `fix` to the active watch. Returns `false` if nobody listens.
    pub fn push(&self, fix: PositionFix) -> bool {
        match &self.state.borrow().watcher {
            Some(tx) => tx.send(fix).is_ok(),
            None => false,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.state.borrow().watcher.is_some()
    }

    /// How many times the watch was cleared.
    pub fn cleared(&self) -> u32 {
        self.state.borrow().cleared
    }
}

impl PositionSource for ScriptedSource {
    fn request_fix(&mut self, tx: Sender<PositionFix>) -> Result<(), TrackerError> {
        if let Some(fix) = self.state.borrow().initial {
            let _ = tx.send(fix);
        }
        Ok(())
    }

    fn watch(&mut self, tx: Sender<PositionFix>) -> Result<WatchId, TrackerError> {
        let mut state = self.state.borrow_mut();
        state.watches += 1;
        state.watcher = Some(tx);
        Ok(WatchId(state.watches))
    }

    fn clear_watch(&mut self, _id: WatchId) {
        let mut state = self.state.borrow_mut();
        state.watcher = None;
        state.cleared += 1;
    }
}

/// Source that accepts requests and never answers them.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentSource;

impl PositionSource for SilentSource {
    fn request_fix(&mut self, _tx: Sender<PositionFix>) -> Result<(), TrackerError> {
        Ok(())
    }

    fn watch(&mut self, _tx: Sender<PositionFix>) -> Result<WatchId, TrackerError> {
        Ok(WatchId(1))
    }

    fn clear_watch(&mut self, _id: WatchId) {}
}

/// Source that refuses like a denied location permission.
#[derive(Clone, Debug)]
pub struct DeniedSource {
    reason: String,
}

impl DeniedSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DeniedSource {
    fn default() -> Self {
        Self::new("permission denied")
    }
}

impl PositionSource for DeniedSource {
    fn request_fix(&mut self, _tx: Sender<PositionFix>) -> Result<(), TrackerError> {
        Err(TrackerError::LocationUnavailable(self.reason.clone()))
    }

    fn watch(&mut self, _tx: Sender<PositionFix>) -> Result<WatchId, TrackerError> {
        Err(TrackerError::LocationUnavailable(self.reason.clone()))
    }

    fn clear_watch(&mut self, _id: WatchId) {}
}

/// A straight walk, either in world space or on the globe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Walk {
    /// Start point and metres per step along each axis.
    World { start: WorldPoint, step: WorldPoint },
    /// Start location and metres per step north and east.
    Geo { start: GeoPoint, north: f64, east: f64 },
}

impl Walk {
    /// Fix after `n` steps, stamped `n * interval`.
    pub fn fix_at(&self, n: u64, interval: Duration) -> PositionFix {
        let ts = n * interval.as_millis() as u64;
        match *self {
            Walk::World { start, step } => {
                let k = n as f32;
                PositionFix::world(
                    WorldPoint::new(
                        start.x + step.x * k,
                        start.y + step.y * k,
                        start.z + step.z * k,
                    ),
                    ts,
                )
            }
            Walk::Geo { start, north, east } => {
                let k = n as f64;
                let lat = start.latitude + north * k / METERS_PER_DEGREE_LAT;
                let lon = start.longitude + east * k / meters_per_degree_lon(start.latitude);
                PositionFix::geo(GeoPoint::new(lat, lon), ts)
            }
        }
    }
}

enum WalkCmd {
    Shutdown,
}

/// Position source backed by a thread that walks a [`Walk`].
///
/// The one-shot fix is the start point. The watch thread emits one fix per
/// `interval` until the watch is cleared or `max_steps` is reached.
pub struct WalkSource {
    walk: Walk,
    interval: Duration,
    max_steps: Option<u64>,
    worker: Option<(Sender<WalkCmd>, JoinHandle<()>)>,
}

impl WalkSource {
    pub fn new(walk: Walk, interval: Duration) -> Self {
        Self {
            walk,
            interval,
            max_steps: None,
            worker: None,
        }
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    fn shutdown(&mut self) {
        if let Some((tx_cmd, handle)) = self.worker.take() {
            let _ = tx_cmd.send(WalkCmd::Shutdown);
            let _ = handle.join();
            debug!("Walk thread joined");
        }
    }
}

fn walk_thread(
    walk: Walk,
    interval: Duration,
    max_steps: Option<u64>,
    rx_cmd: Receiver<WalkCmd>,
    tx: Sender<PositionFix>,
) {
    let mut n = 1;
    loop {
        match rx_cmd.recv_timeout(interval) {
            Ok(WalkCmd::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        if tx.send(walk.fix_at(n, interval)).is_err() {
            break;
        }
        if max_steps.is_some_and(|max| n >= max) {
            break;
        }
        n += 1;
    }
}

impl PositionSource for WalkSource {
    fn request_fix(&mut self, tx: Sender<PositionFix>) -> Result<(), TrackerError> {
        let _ = tx.send(self.walk.fix_at(0, self.interval));
        Ok(())
    }

    fn watch(&mut self, tx: Sender<PositionFix>) -> Result<WatchId, TrackerError> {
        self.shutdown();
        let (tx_cmd, rx_cmd) = unbounded::<WalkCmd>();
        let (walk, interval, max_steps) = (self.walk, self.interval, self.max_steps);
        let handle = std::thread::spawn(move || walk_thread(walk, interval, max_steps, rx_cmd, tx));
        self.worker = Some((tx_cmd, handle));
        info!("Walk started ({:?} per step)", interval);
        Ok(WatchId(1))
    }

    fn clear_watch(&mut self, _id: WatchId) {
        self.shutdown();
    }
}

impl Drop for WalkSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Default)]
struct CameraState {
    refuse: Option<String>,
    streaming: bool,
    acquired: u32,
    released: u32,
}

/// Camera device double.
#[derive(Clone, Debug, Default)]
pub struct FakeCamera {
    state: Rc<RefCell<CameraState>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A camera whose acquisition fails with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        let camera = Self::default();
        camera.state.borrow_mut().refuse = Some(reason.into());
        camera
    }

    pub fn acquired(&self) -> u32 {
        self.state.borrow().acquired
    }

    pub fn released(&self) -> u32 {
        self.state.borrow().released
    }
}

impl CameraDevice for FakeCamera {
    fn acquire(&mut self) -> Result<(), ResourceUnavailable> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = &state.refuse {
            return Err(ResourceUnavailable::Camera(reason.clone()));
        }
        state.streaming = true;
        state.acquired += 1;
        Ok(())
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.streaming {
            state.streaming = false;
            state.released += 1;
        }
    }

    fn is_streaming(&self) -> bool {
        self.state.borrow().streaming
    }
}

#[derive(Default)]
struct BridgeState {
    supported: bool,
    attached: bool,
    running: bool,
    options: Option<ArSessionOptions>,
    pose: CameraPose,
    next_anchor: u64,
    anchors: Vec<(AnchorId, WorldPoint)>,
    removed: Vec<AnchorId>,
    next_subscription: u64,
    frames: Vec<(FrameSubscription, FrameCallback)>,
}

/// Native AR bridge double.
#[derive(Clone, Default)]
pub struct FakeBridge {
    state: Rc<RefCell<BridgeState>>,
}

impl FakeBridge {
    /// A bridge on a device with native AR.
    pub fn supported() -> Self {
        let bridge = Self::default();
        bridge.state.borrow_mut().supported = true;
        bridge
    }

    /// A bridge on a device without native AR.
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// Move the camera and deliver a frame to every subscriber.
    pub fn emit_frame(&self, position: WorldPoint, timestamp_ms: u64) {
        let mut state = self.state.borrow_mut();
        state.pose.position = position;
        let frame = ArFrame {
            pose: state.pose,
            timestamp_ms,
        };
        for (_, callback) in state.frames.iter_mut() {
            callback(frame);
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    pub fn session_options(&self) -> Option<ArSessionOptions> {
        self.state.borrow().options
    }

    /// Anchors currently placed.
    pub fn anchors(&self) -> Vec<AnchorId> {
        self.state
            .borrow()
            .anchors
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn removed_anchors(&self) -> Vec<AnchorId> {
        self.state.borrow().removed.clone()
    }

    pub fn frame_subscribers(&self) -> usize {
        self.state.borrow().frames.len()
    }
}

impl ArBridge for FakeBridge {
    fn is_supported(&self) -> bool {
        self.state.borrow().supported
    }

    fn attach_view(&mut self) -> Result<(), BridgeError> {
        let mut state = self.state.borrow_mut();
        if !state.supported {
            return Err(BridgeError::Unsupported);
        }
        state.attached = true;
        Ok(())
    }

    fn detach_view(&mut self) {
        self.state.borrow_mut().attached = false;
    }

    fn start_session(&mut self, options: ArSessionOptions) -> Result<(), BridgeError> {
        let mut state = self.state.borrow_mut();
        if !state.attached {
            return Err(BridgeError::Failed("view not attached".into()));
        }
        state.running = true;
        state.options = Some(options);
        Ok(())
    }

    fn stop_session(&mut self) {
        let mut state = self.state.borrow_mut();
        state.running = false;
        state.frames.clear();
    }

    fn add_anchor(&mut self, position: WorldPoint) -> Result<AnchorId, BridgeError> {
        let mut state = self.state.borrow_mut();
        if !state.running {
            return Err(BridgeError::Failed("session not running".into()));
        }
        state.next_anchor += 1;
        let id = AnchorId(format!("anchor-{}", state.next_anchor));
        state.anchors.push((id.clone(), position));
        Ok(id)
    }

    fn remove_anchor(&mut self, id: &AnchorId) -> Result<(), BridgeError> {
        let mut state = self.state.borrow_mut();
        let before = state.anchors.len();
        state.anchors.retain(|(a, _)| a != id);
        if state.anchors.len() == before {
            return Err(BridgeError::Failed(format!("unknown anchor {}", id.0)));
        }
        state.removed.push(id.clone());
        Ok(())
    }

    fn camera_pose(&self) -> Result<CameraPose, BridgeError> {
        let state = self.state.borrow();
        if !state.running {
            return Err(BridgeError::Failed("session not running".into()));
        }
        Ok(state.pose)
    }

    fn on_frame(&mut self, callback: FrameCallback) -> Result<FrameSubscription, BridgeError> {
        let mut state = self.state.borrow_mut();
        state.next_subscription += 1;
        let id = FrameSubscription(state.next_subscription);
        state.frames.push((id, callback));
        Ok(id)
    }

    fn remove_frame_subscription(&mut self, id: FrameSubscription) {
        self.state.borrow_mut().frames.retain(|(sub, _)| *sub != id);
    }
}
