//! Hearth Engine Core
//!
//! Contains the fundamental simulation pieces:
//! - Entity Component System registry (entities, pools, systems, hierarchy)
//! - Fixed-step simulation time
//! - Scene hosting (one registry per scene, driven once per frame)

pub mod ecs;
pub mod scene;
pub mod time;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
