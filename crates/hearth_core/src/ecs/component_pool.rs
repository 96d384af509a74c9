// component_pool.rs - Dense per-type component storage
//
// Values live contiguously in `dense`; `slot_of` maps an entity to its slot
// and `entity_at` maps a slot back to its entity. Removal swaps the last
// slot into the hole so the array never has tombstones.

use crate::ecs::{Component, EntityId};
use std::any::Any;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("entity {entity} has no component in this pool")]
    NotFound { entity: EntityId },
}

/// Dense storage for every instance of one component type.
pub struct ComponentPool<T> {
    dense: Vec<T>,
    entity_at: Vec<EntityId>,
    slot_of: HashMap<EntityId, usize>,
}

impl<T> ComponentPool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::with_capacity(capacity),
            entity_at: Vec::with_capacity(capacity),
            slot_of: HashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slot_of.contains_key(&entity)
    }

    /// Insert or overwrite the component for `entity`.
    ///
    /// Returns the previous value when one was overwritten.
    pub fn set(&mut self, entity: EntityId, value: T) -> Option<T> {
        if let Some(&slot) = self.slot_of.get(&entity) {
            return Some(std::mem::replace(&mut self.dense[slot], value));
        }

        let slot = self.dense.len();
        self.dense.push(value);
        self.entity_at.push(entity);
        self.slot_of.insert(entity, slot);
        None
    }

    pub fn get(&self, entity: EntityId) -> Result<&T, PoolError> {
        let slot = self.slot(entity)?;
        Ok(&self.dense[slot])
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Result<&mut T, PoolError> {
        let slot = self.slot(entity)?;
        Ok(&mut self.dense[slot])
    }

    /// Remove the component for `entity` by swapping the last slot into its
    /// place. Absent entities are ignored.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let slot = self.slot_of.remove(&entity)?;
        let last = self.dense.len() - 1;

        if slot != last {
            let moved = self.entity_at[last];
            self.slot_of.insert(moved, slot);
        }

        self.entity_at.swap_remove(slot);
        Some(self.dense.swap_remove(slot))
    }

    /// Entities in slot order.
    pub fn entities(&self) -> &[EntityId] {
        &self.entity_at
    }

    /// Components in slot order.
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entity_at.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entity_at.iter().copied().zip(self.dense.iter_mut())
    }

    fn slot(&self, entity: EntityId) -> Result<usize, PoolError> {
        self.slot_of
            .get(&entity)
            .copied()
            .ok_or(PoolError::NotFound { entity })
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        self.dense.len() == self.entity_at.len()
            && self.slot_of.len() == self.dense.len()
            && self
                .slot_of
                .iter()
                .all(|(&entity, &slot)| self.entity_at[slot] == entity)
    }
}

/// Type-erased view of a pool so the registry can scrub a destroyed entity
/// from every pool without knowing the component types.
pub(crate) trait ErasedPool: Any {
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
