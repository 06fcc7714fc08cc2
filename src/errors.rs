//! Error types.
//!
//! Only [`EngineError`] ever reaches the caller of a session operation.
//! Resource acquisition problems ([`ResourceUnavailable`]) are caught inside
//! `initialize` and turned into advisories plus degraded flags; collaborator
//! failures after that point are logged and swallowed.

use thiserror::Error;

use crate::resources::sessionstate::SessionStates;

/// Errors surfaced by [`Session`](crate::session::Session) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The drawing surface could not be created. The session stays out of
    /// `Active`.
    #[error("initialization failed: {0}")]
    InitializationFailure(String),
    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionStates, to: SessionStates },
    /// Entity operations are only valid while the session is Active or Paused.
    #[error("session is not running (state: {state:?})")]
    NotRunning { state: SessionStates },
}

/// An optional device could not be acquired. The engine degrades instead of
/// aborting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceUnavailable {
    #[error("camera unavailable: {0}")]
    Camera(String),
    #[error("location unavailable: {0}")]
    Location(String),
    #[error("native AR unavailable: {0}")]
    NativeAr(String),
}

/// Failure of a location or pose source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
}

/// Failure reported by the native AR bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("AR not supported on this device")]
    Unsupported,
    #[error("AR bridge call failed: {0}")]
    Failed(String),
}

/// Failure while delivering a session summary.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("summary endpoint failed: {0}")]
    Endpoint(String),
    #[error("local summary log: {0}")]
    Io(#[from] std::io::Error),
    #[error("summary encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure while reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    Load(String),
    #[error("failed to save config file: {0}")]
    Save(String),
}
