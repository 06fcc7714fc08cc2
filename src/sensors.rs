//! Device sensor seams.
//!
//! Only the camera lives here; location goes through
//! [`PositionSource`](crate::tracker::PositionSource).

use crate::errors::ResourceUnavailable;

/// Camera stream used as the AR background.
pub trait CameraDevice {
    /// Open the stream. A refusal is a [`ResourceUnavailable::Camera`].
    fn acquire(&mut self) -> Result<(), ResourceUnavailable>;
    /// Stop every track of the stream. Releasing a closed camera is a no-op.
    fn release(&mut self);
    fn is_streaming(&self) -> bool;
}
