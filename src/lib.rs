//! Spatial engine library.
//!
//! A session-scoped engine that renders collectible "energy coins", map
//! markers and routes over a camera feed or a flat map, tracks the user's
//! world pose and geo location, and collects coins by proximity.
//!
//! - [`session`] – the [`Session`](session::Session) controller and its host seams
//! - [`components`], [`resources`], [`events`], [`systems`] – the ECS world of a session
//! - [`store`] – entity store operations over the world
//! - [`projection`] – world/geo/screen conversions
//! - [`tracker`] – position sources and the polling tracker
//! - [`renderloop`] – frame scheduling against the host
//! - [`bridge`] – native AR bridge seam
//! - [`sensors`] – camera seam
//! - [`reporting`] – session summaries on a background thread
//! - [`sim`] – simulated devices for the demo and tests

pub mod bridge;
pub mod components;
pub mod errors;
pub mod events;
pub mod projection;
pub mod renderloop;
pub mod reporting;
pub mod resources;
pub mod sensors;
pub mod session;
pub mod sim;
pub mod store;
pub mod systems;
pub mod tracker;
