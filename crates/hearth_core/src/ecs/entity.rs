//! Entity handles
//!
//! An entity is nothing but a number; all of its data lives in the
//! [`Registry`]. [`EntityMut`] is a borrowed view that forwards the usual
//! per-entity operations to the registry it came from.
//!
//! IDs are recycled after destruction and carry no generation counter, so a
//! handle must not be kept past the flush that destroys its entity.

use crate::ecs::{Component, EntityId, Registry, RegistryError};
use std::fmt;

/// Entity handle (plain ID, `Copy`)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(EntityId);

impl Entity {
    pub const fn from_raw(id: EntityId) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn id(self) -> EntityId {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable view of one live entity.
///
/// Obtained from [`Registry::entity_mut`] or [`Registry::spawn`], which
/// check liveness once; every operation here can then assume the entity is
/// live for as long as the borrow lasts.
///
/// # Example
/// ```ignore
/// let mut player = registry.spawn();
/// player
///     .add_component(Transform::default())
///     .add_tag("players")
///     .set_name("player1");
/// player.set_parent(container)?;
/// ```
pub struct EntityMut<'r> {
    registry: &'r mut Registry,
    entity: Entity,
}

impl<'r> EntityMut<'r> {
    pub(crate) fn new(registry: &'r mut Registry, entity: Entity) -> Self {
        Self { registry, entity }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn add_component<T: Component>(&mut self, component: T) -> &mut Self {
        self.registry.insert_component(self.entity, component);
        self
    }

    pub fn remove_component<T: Component>(&mut self) -> Option<T> {
        self.registry.take_component::<T>(self.entity)
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.entity)
    }

    pub fn component<T: Component>(&self) -> Result<&T, RegistryError> {
        self.registry.component::<T>(self.entity)
    }

    pub fn component_mut<T: Component>(&mut self) -> Result<&mut T, RegistryError> {
        self.registry.component_mut::<T>(self.entity)
    }

    pub fn component_count(&self) -> usize {
        self.registry.live_component_count(self.entity)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.registry.assign_name(self.entity, name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.registry.name_of(self.entity)
    }

    pub fn remove_name(&mut self) -> Option<String> {
        self.registry.remove_name(self.entity)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.registry.insert_tag(self.entity, tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.registry.has_tag(self.entity, tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.registry.remove_tag(self.entity, tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.registry.tags_of(self.entity)
    }

    /// Parent this entity under `parent`, detaching it from any previous one.
    pub fn set_parent(&mut self, parent: Entity) -> Result<&mut Self, RegistryError> {
        self.registry.set_parent(self.entity, parent)?;
        Ok(self)
    }

    pub fn parent(&self) -> Option<Entity> {
        self.registry.parent_of(self.entity)
    }

    /// Detach from the parent and move back to the root set.
    pub fn remove_parent(&mut self) -> Option<Entity> {
        self.registry.demote_to_root(self.entity)
    }

    pub fn children(&self) -> &[Entity] {
        self.registry.children_of(self.entity)
    }

    /// Queue the entity for destruction at the next flush.
    pub fn kill(self) {
        self.registry.queue_kill(self.entity);
    }
}
