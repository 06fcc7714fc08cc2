//! Frame scheduling.
//!
//! The host display drives the engine: the engine asks a [`FrameHost`] for
//! the next frame with a fresh [`FrameToken`] and the host later calls back
//! with that token (`Session::run_frame`). [`RenderLoop`] keeps at most one
//! request in flight and holds its token as the cancellation handle. A frame
//! whose token is not the pending one is refused, which makes "no tick after
//! cancel" checkable on its own.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use log::debug;

/// Identifies one requested frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub u64);

/// The display's frame scheduler (vsync callback, animation frame, timer).
pub trait FrameHost {
    /// Call back once with `token` at the next display refresh.
    fn request_frame(&mut self, token: FrameToken);
    /// Drop a pending request. Unknown tokens are ignored.
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Single-continuation scheduler state.
#[derive(Debug, Default)]
pub struct RenderLoop {
    next_token: u64,
    pending: Option<FrameToken>,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the next frame unless one is already pending.
    pub fn schedule(&mut self, host: &mut dyn FrameHost) -> FrameToken {
        if let Some(token) = self.pending {
            return token;
        }
        self.next_token += 1;
        let token = FrameToken(self.next_token);
        self.pending = Some(token);
        host.request_frame(token);
        token
    }

    /// Consume the pending request if `token` matches it.
    pub fn accept(&mut self, token: FrameToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            debug!("Ignoring frame {:?} (pending {:?})", token, self.pending);
            false
        }
    }

    /// Cancel the pending request, if any.
    pub fn cancel(&mut self, host: &mut dyn FrameHost) {
        if let Some(token) = self.pending.take() {
            host.cancel_frame(token);
        }
    }

    pub fn pending(&self) -> Option<FrameToken> {
        self.pending
    }
}

/// In-memory [`FrameHost`]: requested tokens wait in a queue until the
/// driver pops them. Clones share the queue.
#[derive(Clone, Debug, Default)]
pub struct FrameQueue {
    inner: Rc<RefCell<VecDeque<FrameToken>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next frame to deliver.
    pub fn pop(&self) -> Option<FrameToken> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl FrameHost for FrameQueue {
    fn request_frame(&mut self, token: FrameToken) {
        self.inner.borrow_mut().push_back(token);
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.inner.borrow_mut().retain(|t| *t != token);
    }
}
