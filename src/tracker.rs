//! Position tracking.
//!
//! A [`PositionSource`] is the push-based device API (geolocation watch, AR
//! camera pose). It delivers [`PositionFix`]es on a crossbeam channel from
//! whatever thread it likes, at whatever cadence it likes. The
//! [`PositionTracker`] owns the receiving end and is polled from the engine
//! thread once per frame. Polling keeps only the newest fix; older ones are
//! dropped, never queued.
//!
//! Startup follows the device API: one one-shot fix, waited for with a
//! bounded timeout, then a continuous watch. A one-shot fix that arrives
//! after the timeout is still picked up by the next poll.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, info, warn};
use serde::Serialize;

use crate::components::geoposition::GeoPoint;
use crate::components::worldposition::WorldPoint;
use crate::errors::TrackerError;

/// A position in exactly one coordinate system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "space", rename_all = "lowercase")]
pub enum Position {
    World(WorldPoint),
    Geo(GeoPoint),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionFix {
    pub position: Position,
    /// Source timestamp in milliseconds. Orders fixes; never compared with
    /// the frame clock.
    pub timestamp_ms: u64,
}

impl PositionFix {
    pub fn world(p: WorldPoint, timestamp_ms: u64) -> Self {
        Self {
            position: Position::World(p),
            timestamp_ms,
        }
    }

    pub fn geo(p: GeoPoint, timestamp_ms: u64) -> Self {
        Self {
            position: Position::Geo(p),
            timestamp_ms,
        }
    }
}

/// Handle of a continuous subscription on a [`PositionSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// External location or pose provider.
pub trait PositionSource {
    /// Ask for a single fix, delivered on `tx` whenever it is ready (possibly
    /// never). Fails right away if the source cannot be used at all.
    fn request_fix(&mut self, tx: Sender<PositionFix>) -> Result<(), TrackerError>;
    /// Start continuous delivery on `tx` until [`PositionSource::clear_watch`].
    fn watch(&mut self, tx: Sender<PositionFix>) -> Result<WatchId, TrackerError>;
    fn clear_watch(&mut self, id: WatchId);
}

/// How [`PositionTracker::start`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// The one-shot fix arrived in time.
    Fixed,
    /// The wait timed out; the watch is running and the tracker has no fix.
    AwaitingFix,
}

pub type UpdateCallback = Box<dyn FnMut(&PositionFix)>;

/// Wraps a [`PositionSource`] and keeps the latest fix.
#[derive(Default)]
pub struct PositionTracker {
    source: Option<Box<dyn PositionSource>>,
    rx: Option<Receiver<PositionFix>>,
    watch: Option<WatchId>,
    current: Option<PositionFix>,
    on_update: Option<UpdateCallback>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `source`.
    ///
    /// Requests the one-shot fix and waits up to `timeout` for it, then
    /// starts the watch. `on_update` is called for the one-shot fix and for
    /// every fix accepted by [`PositionTracker::poll`]. A tracker that is
    /// already running is stopped first.
    pub fn start(
        &mut self,
        mut source: Box<dyn PositionSource>,
        on_update: UpdateCallback,
        timeout: Duration,
    ) -> Result<StartOutcome, TrackerError> {
        self.stop();

        let (tx, rx) = unbounded::<PositionFix>();
        source.request_fix(tx.clone())?;
        self.on_update = Some(on_update);

        let outcome = match rx.recv_timeout(timeout) {
            Ok(fix) => {
                self.accept(fix);
                // Anything else already queued is newer than the one-shot.
                self.rx = Some(rx);
                self.poll();
                StartOutcome::Fixed
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("No initial position fix within {:?}", timeout);
                self.rx = Some(rx);
                StartOutcome::AwaitingFix
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Position source dropped the one-shot request");
                self.rx = Some(rx);
                StartOutcome::AwaitingFix
            }
        };

        match source.watch(tx) {
            Ok(id) => {
                debug!("Position watch {:?} started", id);
                self.watch = Some(id);
                self.source = Some(source);
                info!("Position tracker started ({:?})", outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.stop();
                Err(e)
            }
        }
    }

    /// Drain pending fixes and keep the newest.
    ///
    /// Returns the accepted fix, if any. Fixes older than the current one are
    /// dropped.
    pub fn poll(&mut self) -> Option<PositionFix> {
        let rx = self.rx.as_ref()?;
        let newest = rx.try_iter().max_by_key(|fix| fix.timestamp_ms)?;
        if let Some(current) = self.current
            && newest.timestamp_ms < current.timestamp_ms
        {
            debug!(
                "Dropping stale fix ({} < {})",
                newest.timestamp_ms, current.timestamp_ms
            );
            return None;
        }
        self.accept(newest);
        Some(newest)
    }

    fn accept(&mut self, fix: PositionFix) {
        self.current = Some(fix);
        if let Some(on_update) = self.on_update.as_mut() {
            on_update(&fix);
        }
    }

    /// Last known fix; `None` before the first one.
    pub fn current(&self) -> Option<PositionFix> {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.rx.is_some()
    }

    /// Cancel the watch. No `on_update` call happens after this returns.
    pub fn stop(&mut self) {
        self.on_update = None;
        self.rx = None;
        if let (Some(mut source), Some(id)) = (self.source.take(), self.watch.take()) {
            source.clear_watch(id);
            info!("Position tracker stopped");
        }
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
