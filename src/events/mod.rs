//! Event types and observers used by the engine.
//!
//! Submodules:
//! - [`collection`] – collection and milestone events triggered by the collision detector
//! - [`session`] – events and advisories delivered to session subscribers
pub mod collection;
pub mod session;
