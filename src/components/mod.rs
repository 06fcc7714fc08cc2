//! ECS components for session entities.
//!
//! Entities in a session world are collectibles, map markers and routes.
//! Positions are stored in world or geo space only; screen coordinates are
//! derived every frame and never stored on an entity.
//!
//! Submodules overview:
//! - [`anchor`] – native AR anchor attached to a world collectible
//! - [`collectible`] – collectible state and the snapshot handed to callers
//! - [`geoposition`] – geographic coordinate and its component
//! - [`marker`] – map pin identity, title and colour
//! - [`route`] – polyline in world or geo space with its stroke style
//! - [`screenposition`] – pixel coordinates and surface sizes
//! - [`worldposition`] – AR world-space point and its component

pub mod anchor;
pub mod collectible;
pub mod geoposition;
pub mod marker;
pub mod route;
pub mod screenposition;
pub mod worldposition;
