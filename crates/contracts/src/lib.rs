//! # Contracts
//!
//! Frozen interface contracts shared by the provider crates: geometry, actor
//! handles, blueprints, traffic-light types, batch commands and configuration.
//! Business crates depend on this crate; reverse dependencies are prohibited.
//!
//! ## Units
//! - Positions in metres, angles in degrees (simulator convention)
//! - Frame numbers are the simulator's monotonically increasing tick counter

mod actor;
mod blueprint;
mod blueprint_id;
mod config;
mod error;
mod geometry;
mod route;
mod traffic_light;
mod world;

pub use actor::*;
pub use blueprint::*;
pub use blueprint_id::BlueprintId;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use route::*;
pub use traffic_light::*;
pub use world::*;
