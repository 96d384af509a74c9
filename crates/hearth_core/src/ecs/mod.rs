//! Entity Component System core types.
//!
//! A [`Registry`] owns every entity and its data. Entities are plain IDs,
//! components live in one [`ComponentPool`] per type, and each [`System`]
//! keeps the list of entities whose component [`Signature`] covers its own.
//! Structural changes (creation, destruction) are queued and applied at
//! [`Registry::update_entities`], so systems always iterate a stable set
//! during a frame.

mod component;
mod component_pool;
mod config;
mod entity;
mod registry;
mod registry_error;
mod signature;
mod system;
mod system_registry;

/// Raw entity identifier. Recycled after destruction.
pub type EntityId = u32;

pub use component::{Component, ComponentId, ComponentMeta, ComponentSet, ComponentTypeRegistry};
pub use component_pool::{ComponentPool, PoolError};
pub use config::{RegistryConfig, DEFAULT_POOL_CAPACITY};
pub use entity::{Entity, EntityMut};
pub use registry::Registry;
pub use registry_error::RegistryError;
pub use signature::Signature;
pub use system::{System, SystemState};
pub(crate) use system_registry::SystemRegistry;
