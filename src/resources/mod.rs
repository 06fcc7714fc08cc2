//! ECS resources of a session world.
//!
//! Overview
//! - `engineconfig` – engine constants, loaded from an INI file
//! - `entityindex` – id to entity lookup for collectibles, markers and routes
//! - `outbox` – events and anchor releases queued for the session to deliver
//! - `reference` – user pose, user location and fix bookkeeping
//! - `sessionstate` – lifecycle state machine
//! - `stats` – collection counters
//! - `surface` – drawing surface seam and the recording implementation
//! - `view` – camera or map view and live feature flags
//! - `worldtime` – frame clock
pub mod engineconfig;
pub mod entityindex;
pub mod outbox;
pub mod reference;
pub mod sessionstate;
pub mod stats;
pub mod surface;
pub mod view;
pub mod worldtime;
