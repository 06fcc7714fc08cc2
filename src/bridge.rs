//! Native AR bridge seam.
//!
//! On a host with native AR (ARKit/ARCore behind a plugin) the bridge takes
//! over two jobs: it supplies the camera pose stream, which the session
//! consumes through [`BridgePoseSource`] like any other position source, and
//! it anchors spawned collectibles in the native scene. On any other host
//! the session gets [`UnsupportedBridge`] or none at all, and degrades.

use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::Sender;
use serde::Serialize;

use crate::components::worldposition::WorldPoint;
use crate::errors::{BridgeError, TrackerError};
use crate::tracker::{PositionFix, PositionSource, WatchId};

/// Native anchor handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AnchorId(pub String);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: WorldPoint,
    /// Orientation quaternion `[x, y, z, w]`.
    pub rotation: [f32; 4],
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: WorldPoint::ORIGIN,
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// One native frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArFrame {
    pub pose: CameraPose,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArSessionOptions {
    pub plane_detection: bool,
    pub hit_testing: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameSubscription(pub u64);

pub type FrameCallback = Box<dyn FnMut(ArFrame) + Send>;

pub trait ArBridge {
    fn is_supported(&self) -> bool;
    fn attach_view(&mut self) -> Result<(), BridgeError>;
    fn detach_view(&mut self);
    fn start_session(&mut self, options: ArSessionOptions) -> Result<(), BridgeError>;
    fn stop_session(&mut self);
    fn add_anchor(&mut self, position: WorldPoint) -> Result<AnchorId, BridgeError>;
    fn remove_anchor(&mut self, id: &AnchorId) -> Result<(), BridgeError>;
    fn camera_pose(&self) -> Result<CameraPose, BridgeError>;
    /// `callback` may be invoked from a native thread.
    fn on_frame(&mut self, callback: FrameCallback) -> Result<FrameSubscription, BridgeError>;
    fn remove_frame_subscription(&mut self, id: FrameSubscription);
}

/// The bridge is shared between the session (anchors) and its pose source.
pub type SharedBridge = Rc<RefCell<Box<dyn ArBridge>>>;

pub fn share(bridge: Box<dyn ArBridge>) -> SharedBridge {
    Rc::new(RefCell::new(bridge))
}

/// Bridge for hosts without native AR.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedBridge;

impl ArBridge for UnsupportedBridge {
    fn is_supported(&self) -> bool {
        false
    }

    fn attach_view(&mut self) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn detach_view(&mut self) {}

    fn start_session(&mut self, _options: ArSessionOptions) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn stop_session(&mut self) {}

    fn add_anchor(&mut self, _position: WorldPoint) -> Result<AnchorId, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn remove_anchor(&mut self, _id: &AnchorId) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn camera_pose(&self) -> Result<CameraPose, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn on_frame(&mut self, _callback: FrameCallback) -> Result<FrameSubscription, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn remove_frame_subscription(&mut self, _id: FrameSubscription) {}
}

/// Camera pose stream of a bridge as a [`PositionSource`].
///
/// The one-shot fix is the polled camera pose with timestamp 0, so any
/// streamed frame supersedes it.
pub struct BridgePoseSource {
    bridge: SharedBridge,
    subscription: Option<FrameSubscription>,
}

impl BridgePoseSource {
    pub fn new(bridge: SharedBridge) -> Self {
        Self {
            bridge,
            subscription: None,
        }
    }
}

impl From<BridgeError> for TrackerError {
    fn from(err: BridgeError) -> Self {
        TrackerError::LocationUnavailable(err.to_string())
    }
}

impl PositionSource for BridgePoseSource {
    fn request_fix(&mut self, tx: Sender<PositionFix>) -> Result<(), TrackerError> {
        let pose = self.bridge.borrow().camera_pose()?;
        let _ = tx.send(PositionFix::world(pose.position, 0));
        Ok(())
    }

    fn watch(&mut self, tx: Sender<PositionFix>) -> Result<WatchId, TrackerError> {
        let callback: FrameCallback = Box::new(move |frame: ArFrame| {
            let _ = tx.send(PositionFix::world(frame.pose.position, frame.timestamp_ms));
        });
        let sub = self.bridge.borrow_mut().on_frame(callback)?;
        self.subscription = Some(sub);
        Ok(WatchId(sub.0))
    }

    fn clear_watch(&mut self, _id: WatchId) {
        if let Some(sub) = self.subscription.take() {
            self.bridge.borrow_mut().remove_frame_subscription(sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_bridge_refuses_everything() {
        let mut b = UnsupportedBridge;
        assert!(!b.is_supported());
        assert_eq!(b.attach_view(), Err(BridgeError::Unsupported));
        assert_eq!(
            b.add_anchor(WorldPoint::ORIGIN),
            Err(BridgeError::Unsupported)
        );
        assert!(b.camera_pose().is_err());
    }

    #[test]
    fn test_pose_source_over_unsupported_bridge_fails() {
        let mut source = BridgePoseSource::new(share(Box::new(UnsupportedBridge)));
        let (tx, _rx) = crossbeam_channel::unbounded();
        assert!(matches!(
            source.request_fix(tx),
            Err(TrackerError::LocationUnavailable(_))
        ));
    }
}
