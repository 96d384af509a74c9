// registry.rs - Owner of every entity, component pool, system and index
//
// Component, name, tag and hierarchy mutations apply immediately. System
// membership only changes in `update_entities`, which first registers the
// entities created since the last flush and then destroys the ones killed
// since the last flush. Systems never see a half-created or half-destroyed
// entity.

use crate::ecs::component_pool::ErasedPool;
use crate::ecs::system_registry::SystemRegistry;
use crate::ecs::{
    Component, ComponentId, ComponentPool, ComponentTypeRegistry, Entity, EntityId, EntityMut,
    RegistryConfig, RegistryError, Signature, System,
};
use std::any::type_name;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

pub struct Registry {
    config: RegistryConfig,
    total_entities: usize,
    last_entity_number: EntityId,
    free_ids: Vec<EntityId>,

    // Live-entity index: slot `id` is `Some` iff entity `id` is live.
    signatures: Vec<Option<Signature>>,

    types: ComponentTypeRegistry,
    pools: Vec<Option<Box<dyn ErasedPool>>>,
    systems: SystemRegistry,
    // Number of update/render passes currently running.
    pass_depth: u32,

    names: HashMap<EntityId, String>,
    entities_by_name: HashMap<String, BTreeSet<Entity>>,
    tags: HashMap<EntityId, BTreeSet<String>>,
    entities_by_tag: HashMap<String, BTreeSet<Entity>>,

    parents: HashMap<EntityId, Entity>,
    children: HashMap<EntityId, Vec<Entity>>,
    roots: BTreeSet<Entity>,

    to_be_added: Vec<Entity>,
    to_be_killed: Vec<Entity>,
    pending_kill: HashSet<EntityId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            total_entities: 0,
            last_entity_number: 0,
            free_ids: Vec::new(),
            signatures: Vec::new(),
            types: ComponentTypeRegistry::new(),
            pools: Vec::new(),
            systems: SystemRegistry::new(),
            pass_depth: 0,
            names: HashMap::new(),
            entities_by_name: HashMap::new(),
            tags: HashMap::new(),
            entities_by_tag: HashMap::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            roots: BTreeSet::new(),
            to_be_added: Vec::new(),
            to_be_killed: Vec::new(),
            pending_kill: HashSet::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Create an entity with no components.
    ///
    /// Reuses the most recently freed ID when there is one. The entity is a
    /// root of the hierarchy and joins matching systems at the next
    /// [`update_entities`](Self::update_entities).
    pub fn create_entity(&mut self) -> Entity {
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = self.last_entity_number;
                self.last_entity_number = id
                    .checked_add(1)
                    .unwrap_or_else(|| panic!("entity id space exhausted after {id} allocations"));
                id
            }
        };

        let index = id as usize;
        if index >= self.signatures.len() {
            self.signatures.resize_with(index + 1, || None);
        }
        self.signatures[index] = Some(Signature::new());

        let entity = Entity::from_raw(id);
        self.roots.insert(entity);
        self.to_be_added.push(entity);
        self.total_entities += 1;

        if self.config.debug {
            debug!(entity = id, "entity created");
        }
        entity
    }

    /// Create an entity and return a view for populating it.
    pub fn spawn(&mut self) -> EntityMut<'_> {
        let entity = self.create_entity();
        EntityMut::new(self, entity)
    }

    pub fn entity_mut(&mut self, entity: Entity) -> Result<EntityMut<'_>, RegistryError> {
        self.live_signature(entity)?;
        Ok(EntityMut::new(self, entity))
    }

    /// Queue `entity` for destruction at the next flush.
    ///
    /// The entity stays fully queryable until then. Killing an entity that
    /// is already queued does nothing.
    pub fn kill_entity(&mut self, entity: Entity) -> Result<(), RegistryError> {
        self.live_signature(entity)?;
        self.queue_kill(entity);
        Ok(())
    }

    pub(crate) fn queue_kill(&mut self, entity: Entity) {
        if !self.pending_kill.insert(entity.id()) {
            return;
        }
        self.to_be_killed.push(entity);
        self.total_entities -= 1;

        if self.config.debug {
            debug!(entity = entity.id(), "entity killed");
        }
    }

    /// Flush the deferred queues: register created entities with matching
    /// systems, then destroy killed entities. Call once per frame, before
    /// [`update`](Self::update).
    ///
    /// Calls made while systems are running are ignored (with a warning) and
    /// the queues are left for the next flush.
    pub fn update_entities(&mut self) {
        if self.pass_depth > 0 {
            warn!("update_entities called from inside a system pass; deferred to next flush");
            return;
        }
        self.add_created_entities();
        self.remove_killed_entities();
    }

    fn add_created_entities(&mut self) {
        for entity in std::mem::take(&mut self.to_be_added) {
            self.add_entity_to_systems(entity);
        }
    }

    fn add_entity_to_systems(&mut self, entity: Entity) {
        let Some(Some(signature)) = self.signatures.get(entity.id() as usize) else {
            return;
        };
        for state in self.systems.states_mut() {
            if signature.is_superset_of(state.signature()) {
                state.add_entity(entity);
            }
        }
    }

    fn remove_killed_entities(&mut self) {
        self.pending_kill.clear();
        for entity in std::mem::take(&mut self.to_be_killed) {
            self.destroy_entity(entity);
        }
    }

    fn destroy_entity(&mut self, entity: Entity) {
        let id = entity.id();

        for state in self.systems.states_mut() {
            state.remove_entity(entity);
        }

        if let Some(slot) = self.signatures.get_mut(id as usize) {
            *slot = None;
        }
        let mut dropped = 0;
        for pool in self.pools.iter_mut().flatten() {
            if pool.remove_entity(id) {
                dropped += 1;
            }
        }

        self.remove_name(entity);
        self.remove_all_tags(entity);

        self.detach(entity);
        self.roots.remove(&entity);
        for child in self.children.remove(&id).unwrap_or_default() {
            self.parents.remove(&child.id());
            self.roots.insert(child);
        }

        self.free_ids.push(id);

        if self.config.debug {
            debug!(entity = id, components = dropped, "entity destroyed");
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.signature(entity.id()).is_some()
    }

    /// Whether `entity` is queued for destruction at the next flush.
    pub fn is_pending_kill(&self, entity: Entity) -> bool {
        self.pending_kill.contains(&entity.id())
    }

    pub fn entity_by_id(&self, id: EntityId) -> Option<Entity> {
        self.signature(id).map(|_| Entity::from_raw(id))
    }

    /// Every live entity, ascending by ID.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.signatures
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| Entity::from_raw(id as EntityId))
    }

    /// Number of entities created and not yet killed.
    pub fn total_entities(&self) -> usize {
        self.total_entities
    }

    /// Highest ID ever allocated, plus one.
    pub fn last_entity_number(&self) -> EntityId {
        self.last_entity_number
    }

    fn signature(&self, id: EntityId) -> Option<&Signature> {
        self.signatures.get(id as usize).and_then(Option::as_ref)
    }

    fn live_signature(&self, entity: Entity) -> Result<&Signature, RegistryError> {
        self.signature(entity.id())
            .ok_or(RegistryError::DeadEntity(entity.id()))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attach `component` to `entity`, overwriting any existing one of the
    /// same type. Takes effect immediately; system membership does not change
    /// until the entity is next flushed.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<(), RegistryError> {
        self.live_signature(entity)?;
        self.insert_component(entity, component);
        Ok(())
    }

    pub(crate) fn insert_component<T: Component>(&mut self, entity: Entity, component: T) {
        let id = entity.id();
        let cid = self.types.id_for::<T>();
        self.pool_or_insert::<T>(cid).set(id, component);
        if let Some(Some(signature)) = self.signatures.get_mut(id as usize) {
            signature.insert(cid);
        }

        if self.config.debug {
            debug!(entity = id, component = T::name(), "component added");
        }
    }

    /// Detach and return the `T` component of `entity`, if it has one.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<Option<T>, RegistryError> {
        self.live_signature(entity)?;
        Ok(self.take_component::<T>(entity))
    }

    pub(crate) fn take_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let id = entity.id();
        let cid = self.types.lookup::<T>()?;
        let removed = self.pool_mut::<T>()?.remove(id)?;
        if let Some(Some(signature)) = self.signatures.get_mut(id as usize) {
            signature.remove(cid);
        }

        if self.config.debug {
            debug!(entity = id, component = T::name(), "component removed");
        }
        Some(removed)
    }

    pub fn component<T: Component>(&self, entity: Entity) -> Result<&T, RegistryError> {
        self.live_signature(entity)?;
        self.pool::<T>()
            .and_then(|pool| pool.get(entity.id()).ok())
            .ok_or(RegistryError::MissingComponent {
                entity: entity.id(),
                component: T::name(),
            })
    }

    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, RegistryError> {
        self.live_signature(entity)?;
        self.pool_mut::<T>()
            .and_then(|pool| pool.get_mut(entity.id()).ok())
            .ok_or(RegistryError::MissingComponent {
                entity: entity.id(),
                component: T::name(),
            })
    }

    /// Whether `entity` currently holds a `T`. Unknown entities and
    /// never-registered types answer `false`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match (self.types.lookup::<T>(), self.signature(entity.id())) {
            (Some(cid), Some(signature)) => signature.contains(cid),
            _ => false,
        }
    }

    /// IDs of the component types `entity` holds, ascending.
    pub fn components_of(&self, entity: Entity) -> Result<Vec<ComponentId>, RegistryError> {
        Ok(self.live_signature(entity)?.ids().collect())
    }

    pub fn component_count(&self, entity: Entity) -> Result<usize, RegistryError> {
        Ok(self.live_signature(entity)?.count())
    }

    // Only for handles that cannot outlive their entity (`EntityMut`).
    pub(crate) fn live_component_count(&self, entity: Entity) -> usize {
        self.signature(entity.id())
            .expect("entity view refers to a live entity")
            .count()
    }

    pub fn signature_of(&self, entity: Entity) -> Result<&Signature, RegistryError> {
        self.live_signature(entity)
    }

    /// Every stored `T`, for bulk iteration.
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let cid = self.types.lookup::<T>()?;
        self.pools
            .get(cid as usize)?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
    }

    fn pool_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        let cid = self.types.lookup::<T>()?;
        self.pools
            .get_mut(cid as usize)?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }

    fn pool_or_insert<T: Component>(&mut self, cid: ComponentId) -> &mut ComponentPool<T> {
        let index = cid as usize;
        if index >= self.pools.len() {
            self.pools.resize_with(index + 1, || None);
        }
        let capacity = self.config.base_pool_capacity;
        self.pools[index]
            .get_or_insert_with(|| {
                Box::new(ComponentPool::<T>::with_capacity(capacity)) as Box<dyn ErasedPool>
            })
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .expect("component pool type matches its component id")
    }

    pub fn component_types(&self) -> &ComponentTypeRegistry {
        &self.types
    }

    // =========================================================================
    // Names
    // =========================================================================

    /// Name `entity`, replacing any previous name. Names need not be unique.
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) -> Result<(), RegistryError> {
        self.live_signature(entity)?;
        self.assign_name(entity, name.into());
        Ok(())
    }

    pub(crate) fn assign_name(&mut self, entity: Entity, name: String) {
        self.remove_name(entity);
        self.entities_by_name
            .entry(name.clone())
            .or_default()
            .insert(entity);
        self.names.insert(entity.id(), name);
    }

    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        self.names.get(&entity.id()).map(String::as_str)
    }

    pub fn has_name(&self, entity: Entity) -> bool {
        self.names.contains_key(&entity.id())
    }

    /// Remove and return the name of `entity`. Other entities sharing the
    /// name keep it.
    pub fn remove_name(&mut self, entity: Entity) -> Option<String> {
        let name = self.names.remove(&entity.id())?;
        if let Entry::Occupied(mut holders) = self.entities_by_name.entry(name.clone()) {
            holders.get_mut().remove(&entity);
            if holders.get().is_empty() {
                holders.remove();
            }
        }
        Some(name)
    }

    /// Entities carrying `name`, ascending by ID.
    pub fn entities_with_name<'a>(&'a self, name: &str) -> impl Iterator<Item = Entity> + 'a {
        self.entities_by_name.get(name).into_iter().flatten().copied()
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub fn add_tag(&mut self, entity: Entity, tag: impl Into<String>) -> Result<(), RegistryError> {
        self.live_signature(entity)?;
        self.insert_tag(entity, tag.into());
        Ok(())
    }

    pub(crate) fn insert_tag(&mut self, entity: Entity, tag: String) {
        self.entities_by_tag
            .entry(tag.clone())
            .or_default()
            .insert(entity);
        self.tags.entry(entity.id()).or_default().insert(tag);
    }

    /// Tags of `entity` in lexical order.
    pub fn tags_of(&self, entity: Entity) -> impl Iterator<Item = &str> + '_ {
        self.tags
            .get(&entity.id())
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.entities_by_tag
            .get(tag)
            .is_some_and(|holders| holders.contains(&entity))
    }

    /// Remove one tag. Returns `false` if `entity` did not have it.
    pub fn remove_tag(&mut self, entity: Entity, tag: &str) -> bool {
        let Some(own) = self.tags.get_mut(&entity.id()) else {
            return false;
        };
        if !own.remove(tag) {
            return false;
        }
        if own.is_empty() {
            self.tags.remove(&entity.id());
        }
        self.forget_tag_holder(entity, tag);
        true
    }

    pub fn remove_all_tags(&mut self, entity: Entity) {
        for tag in self.tags.remove(&entity.id()).unwrap_or_default() {
            self.forget_tag_holder(entity, &tag);
        }
    }

    fn forget_tag_holder(&mut self, entity: Entity, tag: &str) {
        if let Some(holders) = self.entities_by_tag.get_mut(tag) {
            holders.remove(&entity);
            if holders.is_empty() {
                self.entities_by_tag.remove(tag);
            }
        }
    }

    /// Entities carrying `tag`, ascending by ID.
    pub fn entities_with_tag<'a>(&'a self, tag: &str) -> impl Iterator<Item = Entity> + 'a {
        self.entities_by_tag.get(tag).into_iter().flatten().copied()
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Parent `child` under `parent`, detaching it from any previous parent.
    ///
    /// Fails with [`RegistryError::HierarchyCycle`] when `parent` is `child`
    /// itself or one of its descendants.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), RegistryError> {
        self.live_signature(child)?;
        self.live_signature(parent)?;

        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(RegistryError::HierarchyCycle {
                    child: child.id(),
                    parent: parent.id(),
                });
            }
            cursor = self.parent_of(ancestor);
        }

        self.detach(child);
        self.roots.remove(&child);
        self.parents.insert(child.id(), parent);
        self.children.entry(parent.id()).or_default().push(child);
        Ok(())
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.parents.get(&entity.id()).copied()
    }

    pub fn has_parent(&self, entity: Entity) -> bool {
        self.parents.contains_key(&entity.id())
    }

    /// Detach `entity` from its parent and move it back to the root set.
    /// Returns the former parent.
    pub fn remove_parent(&mut self, entity: Entity) -> Result<Option<Entity>, RegistryError> {
        self.live_signature(entity)?;
        Ok(self.demote_to_root(entity))
    }

    pub(crate) fn demote_to_root(&mut self, entity: Entity) -> Option<Entity> {
        let parent = self.detach(entity);
        self.roots.insert(entity);
        parent
    }

    fn detach(&mut self, child: Entity) -> Option<Entity> {
        let parent = self.parents.remove(&child.id())?;
        if let Entry::Occupied(mut siblings) = self.children.entry(parent.id()) {
            siblings.get_mut().retain(|&sibling| sibling != child);
            if siblings.get().is_empty() {
                siblings.remove();
            }
        }
        Some(parent)
    }

    /// Children of `entity` in the order they were attached.
    pub fn children_of(&self, entity: Entity) -> &[Entity] {
        self.children
            .get(&entity.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Entities without a parent, ascending by ID.
    pub fn root_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.roots.iter().copied()
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Register `system`, replacing any system of the same type.
    ///
    /// The new system only picks up entities flushed after this call.
    pub fn add_system<S: System>(&mut self, system: S) {
        let replaced = self.systems.insert(system);
        if self.config.debug {
            debug!(system = type_name::<S>(), replaced, "system added");
        }
    }

    /// Build a system with access to the component type registry, so it can
    /// derive its signature, then register it.
    ///
    /// # Example
    /// ```ignore
    /// registry.add_system_with(|types| RenderSystem::new(types.signature_of::<(Transform, Sprite)>()));
    /// ```
    pub fn add_system_with<S, F>(&mut self, build: F)
    where
        S: System,
        F: FnOnce(&mut ComponentTypeRegistry) -> S,
    {
        let system = build(&mut self.types);
        self.add_system(system);
    }

    pub fn remove_system<S: System>(&mut self) -> Option<S> {
        let removed = self.systems.remove::<S>();
        if removed.is_some() && self.config.debug {
            debug!(system = type_name::<S>(), "system removed");
        }
        removed
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.systems.contains::<S>()
    }

    /// Look up a registered system. Systems are detached from the registry
    /// while they run, so lookups from inside `update`/`render` fail.
    pub fn system<S: System>(&self) -> Result<&S, RegistryError> {
        self.systems
            .get::<S>()
            .ok_or(RegistryError::MissingSystem(type_name::<S>()))
    }

    pub fn system_mut<S: System>(&mut self) -> Result<&mut S, RegistryError> {
        self.systems
            .get_mut::<S>()
            .ok_or(RegistryError::MissingSystem(type_name::<S>()))
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Type names of the registered systems in run order.
    pub fn system_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.systems.names()
    }

    /// Run every system's `update` hook in registration order.
    pub fn update(&mut self, dt: f64) {
        let mut systems = self.detach_systems();
        for system in systems.iter_mut() {
            system.update(self, dt);
        }
        self.reattach_systems(systems);
    }

    /// Run every system's `render` hook in registration order.
    pub fn render(&mut self) {
        let mut systems = self.detach_systems();
        for system in systems.iter_mut() {
            system.render(self);
        }
        self.reattach_systems(systems);
    }

    // Passes may nest when a system calls `update`/`render` itself; the
    // registry stays locked against flushing until the outermost one ends.
    fn detach_systems(&mut self) -> SystemRegistry {
        self.pass_depth += 1;
        std::mem::take(&mut self.systems)
    }

    // Systems registered while the pass ran win over the ones that ran.
    fn reattach_systems(&mut self, systems: SystemRegistry) {
        let registered_during_pass = std::mem::replace(&mut self.systems, systems);
        if !registered_during_pass.is_empty() {
            self.systems.absorb(registered_during_pass);
        }
        self.pass_depth -= 1;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::ecs::SystemState;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    define_component!(Position);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }
    define_component!(Velocity);

    #[derive(Debug, PartialEq)]
    struct Label(&'static str);
    define_component!(Label);

    struct MovementSystem {
        state: SystemState,
    }

    impl MovementSystem {
        fn new(types: &mut ComponentTypeRegistry) -> Self {
            Self {
                state: SystemState::new(types.signature_of::<(Position, Velocity)>()),
            }
        }
    }

    impl System for MovementSystem {
        fn state(&self) -> &SystemState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut SystemState {
            &mut self.state
        }

        fn update(&mut self, registry: &mut Registry, dt: f64) {
            for &entity in self.state.entities() {
                let Ok(&velocity) = registry.component::<Velocity>(entity) else {
                    continue;
                };
                if let Ok(position) = registry.component_mut::<Position>(entity) {
                    position.x += velocity.x * dt as f32;
                    position.y += velocity.y * dt as f32;
                }
            }
        }
    }

    struct Spawner {
        state: SystemState,
    }

    impl System for Spawner {
        fn state(&self) -> &SystemState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut SystemState {
            &mut self.state
        }

        fn update(&mut self, registry: &mut Registry, _dt: f64) {
            let entity = registry.create_entity();
            registry
                .add_component(entity, Label("spawned"))
                .unwrap();
            assert!(registry.system::<Spawner>().is_err());
            registry.update_entities();
        }
    }

    fn pos(x: f32, y: f32) -> Position {
        Position { x, y }
    }

    fn vel(x: f32, y: f32) -> Velocity {
        Velocity { x, y }
    }

    #[test]
    fn ids_are_allocated_in_order() {
        let mut registry = Registry::new();
        let ids: Vec<_> = (0..5).map(|_| registry.create_entity().id()).collect();
        registry.update_entities();

        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(registry.total_entities(), 5);
        assert_eq!(registry.last_entity_number(), 5);
        assert_eq!(registry.entities().count(), 5);
    }

    #[test]
    fn most_recently_freed_id_is_reused_first() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        registry.create_entity();
        registry.update_entities();

        registry.kill_entity(a).unwrap();
        registry.kill_entity(b).unwrap();
        registry.update_entities();

        assert_eq!(registry.entity_by_id(a.id()), None);
        assert_eq!(registry.create_entity(), b);
        assert_eq!(registry.create_entity(), a);
        assert_eq!(registry.create_entity().id(), 3);
        assert_eq!(registry.last_entity_number(), 4);
    }

    #[test]
    fn killed_entity_is_queryable_until_flush() {
        let mut registry = Registry::new();
        let entity = registry.create_entity();
        registry.add_component(entity, pos(1.0, 2.0)).unwrap();
        registry.update_entities();

        registry.kill_entity(entity).unwrap();
        registry.kill_entity(entity).unwrap();
        assert_eq!(registry.total_entities(), 0);
        assert!(registry.is_alive(entity));
        assert!(registry.is_pending_kill(entity));
        assert_eq!(registry.component::<Position>(entity), Ok(&pos(1.0, 2.0)));

        registry.update_entities();
        assert!(!registry.is_alive(entity));
        assert!(!registry.is_pending_kill(entity));
        assert_eq!(
            registry.component::<Position>(entity),
            Err(RegistryError::DeadEntity(entity.id()))
        );
        assert_eq!(
            registry.kill_entity(entity),
            Err(RegistryError::DeadEntity(entity.id()))
        );
    }

    #[test]
    fn component_changes_are_immediate() {
        let mut registry = Registry::new();
        let entity = registry.create_entity();
        assert!(!registry.has_component::<Position>(entity));

        registry.add_component(entity, pos(0.0, 0.0)).unwrap();
        registry.add_component(entity, Label("hero")).unwrap();
        assert!(registry.has_component::<Position>(entity));
        assert_eq!(registry.component_count(entity), Ok(2));

        registry.component_mut::<Position>(entity).unwrap().x = 4.0;
        assert_eq!(registry.component::<Position>(entity).unwrap().x, 4.0);

        assert_eq!(registry.remove_component::<Label>(entity), Ok(Some(Label("hero"))));
        assert_eq!(registry.remove_component::<Label>(entity), Ok(None));
        assert_eq!(registry.remove_component::<Velocity>(entity), Ok(None));
        assert!(!registry.has_component::<Label>(entity));
        assert_eq!(
            registry.component::<Label>(entity),
            Err(RegistryError::MissingComponent {
                entity: entity.id(),
                component: "Label",
            })
        );
    }

    #[test]
    fn components_of_lists_ids_ascending() {
        let mut registry = Registry::new();
        let entity = registry.create_entity();
        registry.add_component(entity, Label("x")).unwrap();
        registry.add_component(entity, pos(0.0, 0.0)).unwrap();

        let label = registry.component_types().lookup::<Label>().unwrap();
        let position = registry.component_types().lookup::<Position>().unwrap();
        assert_eq!(registry.components_of(entity), Ok(vec![label, position]));
    }

    #[test]
    fn overwriting_a_component_keeps_one_copy() {
        let mut registry = Registry::new();
        let entity = registry.create_entity();
        registry.add_component(entity, pos(1.0, 1.0)).unwrap();
        registry.add_component(entity, pos(2.0, 2.0)).unwrap();

        assert_eq!(registry.pool::<Position>().map(ComponentPool::len), Some(1));
        assert_eq!(registry.component::<Position>(entity), Ok(&pos(2.0, 2.0)));
    }

    #[test]
    fn system_membership_waits_for_flush() {
        let mut registry = Registry::new();
        registry.add_system_with(MovementSystem::new);

        let entity = registry.create_entity();
        registry.add_component(entity, pos(0.0, 0.0)).unwrap();
        registry.add_component(entity, vel(1.0, 2.0)).unwrap();
        assert!(registry.system::<MovementSystem>().unwrap().entities().is_empty());

        registry.update_entities();
        assert_eq!(
            registry.system::<MovementSystem>().unwrap().entities(),
            &[entity]
        );

        registry.update(0.5);
        assert_eq!(registry.component::<Position>(entity), Ok(&pos(0.5, 1.0)));
    }

    #[test]
    fn partial_signature_does_not_match() {
        let mut registry = Registry::new();
        registry.add_system_with(MovementSystem::new);

        let entity = registry.create_entity();
        registry.add_component(entity, pos(0.0, 0.0)).unwrap();
        registry.update_entities();

        assert!(registry.system::<MovementSystem>().unwrap().entities().is_empty());
    }

    #[test]
    fn removing_a_required_component_keeps_membership_until_kill() {
        let mut registry = Registry::new();
        registry.add_system_with(MovementSystem::new);

        let entity = registry.create_entity();
        registry.add_component(entity, pos(0.0, 0.0)).unwrap();
        registry.add_component(entity, vel(1.0, 0.0)).unwrap();
        registry.update_entities();

        registry.remove_component::<Velocity>(entity).unwrap();
        registry.update_entities();
        assert!(registry.system::<MovementSystem>().unwrap().state().contains(entity));

        // The system tolerates the stale member.
        registry.update(1.0);
        assert_eq!(registry.component::<Position>(entity), Ok(&pos(0.0, 0.0)));

        registry.kill_entity(entity).unwrap();
        registry.update_entities();
        assert!(registry.system::<MovementSystem>().unwrap().entities().is_empty());
    }

    #[test]
    fn replacing_a_system_drops_its_members() {
        let mut registry = Registry::new();
        registry.add_system_with(MovementSystem::new);
        let entity = registry.create_entity();
        registry.add_component(entity, pos(0.0, 0.0)).unwrap();
        registry.add_component(entity, vel(0.0, 0.0)).unwrap();
        registry.update_entities();

        registry.add_system_with(MovementSystem::new);
        assert_eq!(registry.system_count(), 1);
        assert!(registry.system::<MovementSystem>().unwrap().entities().is_empty());
    }

    #[test]
    fn system_lookup_and_removal() {
        let mut registry = Registry::new();
        assert!(!registry.has_system::<MovementSystem>());
        assert!(matches!(
            registry.system::<MovementSystem>(),
            Err(RegistryError::MissingSystem(_))
        ));

        registry.add_system_with(MovementSystem::new);
        assert!(registry.has_system::<MovementSystem>());
        assert!(registry.system_mut::<MovementSystem>().is_ok());
        assert!(registry.system_names().next().unwrap().ends_with("MovementSystem"));

        assert!(registry.remove_system::<MovementSystem>().is_some());
        assert!(registry.remove_system::<MovementSystem>().is_none());
        assert_eq!(registry.system_count(), 0);
    }

    #[test]
    fn flush_inside_a_system_pass_is_deferred() {
        let mut registry = Registry::new();
        registry.add_system(Spawner {
            state: SystemState::default(),
        });

        registry.update(0.0);
        assert_eq!(registry.total_entities(), 1);
        assert!(registry.has_system::<Spawner>());

        // The spawned entity is registered by the next regular flush.
        registry.update_entities();
        assert_eq!(registry.system::<Spawner>().unwrap().entities().len(), 1);
    }

    #[test]
    fn names_are_shared_and_removed_independently() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        registry.set_name(a, "enemy").unwrap();
        registry.set_name(b, "enemy").unwrap();
        assert_eq!(registry.entities_with_name("enemy").count(), 2);

        assert_eq!(registry.remove_name(a), Some("enemy".to_string()));
        assert!(!registry.has_name(a));
        assert_eq!(registry.name_of(b), Some("enemy"));
        assert_eq!(registry.entities_with_name("enemy").collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn renaming_moves_the_name_index() {
        let mut registry = Registry::new();
        let entity = registry.create_entity();
        registry.set_name(entity, "old").unwrap();
        registry.set_name(entity, "new").unwrap();

        assert_eq!(registry.entities_with_name("old").count(), 0);
        assert_eq!(registry.entities_with_name("new").count(), 1);
    }

    #[test]
    fn tags_are_many_to_many() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        registry.add_tag(a, "players").unwrap();
        registry.add_tag(a, "visible").unwrap();
        registry.add_tag(b, "players").unwrap();

        assert_eq!(registry.tags_of(a).collect::<Vec<_>>(), vec!["players", "visible"]);
        assert!(registry.has_tag(b, "players"));
        assert!(!registry.has_tag(b, "visible"));

        assert!(registry.remove_tag(a, "players"));
        assert!(!registry.remove_tag(a, "players"));
        assert_eq!(registry.entities_with_tag("players").collect::<Vec<_>>(), vec![b]);

        registry.remove_all_tags(a);
        assert_eq!(registry.tags_of(a).count(), 0);
        assert_eq!(registry.entities_with_tag("visible").count(), 0);
    }

    #[test]
    fn reparenting_moves_between_child_lists() {
        let mut registry = Registry::new();
        let first = registry.create_entity();
        let second = registry.create_entity();
        let child = registry.create_entity();

        registry.set_parent(child, first).unwrap();
        registry.set_parent(child, first).unwrap();
        assert_eq!(registry.children_of(first), &[child]);
        assert!(!registry.root_entities().any(|e| e == child));

        registry.set_parent(child, second).unwrap();
        assert!(registry.children_of(first).is_empty());
        assert_eq!(registry.children_of(second), &[child]);
        assert_eq!(registry.parent_of(child), Some(second));

        assert_eq!(registry.remove_parent(child), Ok(Some(second)));
        assert!(!registry.has_parent(child));
        assert!(registry.root_entities().any(|e| e == child));
        assert!(registry.children_of(second).is_empty());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        let c = registry.create_entity();
        registry.set_parent(b, a).unwrap();
        registry.set_parent(c, b).unwrap();

        assert_eq!(
            registry.set_parent(a, c),
            Err(RegistryError::HierarchyCycle {
                child: a.id(),
                parent: c.id(),
            })
        );
        assert!(registry.set_parent(a, a).is_err());
        assert_eq!(registry.parent_of(a), None);
    }

    #[test]
    fn destroying_a_parent_promotes_children_to_roots() {
        let mut registry = Registry::new();
        let parent = registry.create_entity();
        let child = registry.create_entity();
        let grandparent = registry.create_entity();
        registry.set_parent(child, parent).unwrap();
        registry.set_parent(parent, grandparent).unwrap();
        registry.update_entities();

        registry.kill_entity(parent).unwrap();
        registry.update_entities();

        assert_eq!(registry.parent_of(child), None);
        assert!(registry.root_entities().any(|e| e == child));
        assert!(registry.children_of(grandparent).is_empty());
        assert!(!registry.root_entities().any(|e| e == parent));
    }

    struct NestedRenderer {
        state: SystemState,
    }

    impl System for NestedRenderer {
        fn state(&self) -> &SystemState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut SystemState {
            &mut self.state
        }

        fn update(&mut self, registry: &mut Registry, _dt: f64) {
            registry.render();
            let entity = registry.create_entity();
            registry.add_component(entity, Label("late")).unwrap();
            registry.update_entities();
            if let Some(&tracked) = self.state.entities().first() {
                registry.kill_entity(tracked).unwrap();
                registry.update_entities();
            }
        }
    }

    fn nested_renderer(types: &mut ComponentTypeRegistry) -> NestedRenderer {
        NestedRenderer {
            state: SystemState::new(types.signature_of::<(Label,)>()),
        }
    }

    #[test]
    fn nested_pass_keeps_flush_deferred() {
        let mut registry = Registry::new();
        registry.add_system_with(nested_renderer);

        registry.update(0.0);
        assert_eq!(registry.pass_depth, 0);
        registry.update_entities();
        let first = Entity::from_raw(0);
        assert_eq!(registry.system::<NestedRenderer>().unwrap().entities(), &[first]);

        // Second frame kills the tracked entity from inside the nested pass;
        // it must leave the system at the next regular flush.
        registry.update(0.0);
        assert!(registry.is_alive(first));
        registry.update_entities();
        let tracked = registry.system::<NestedRenderer>().unwrap().entities();
        assert_eq!(tracked, &[Entity::from_raw(1)]);
        assert!(!registry.is_alive(first));
        assert_eq!(registry.create_entity(), first);
    }

    #[test]
    fn adds_are_flushed_before_kills() {
        let mut registry = Registry::new();
        registry.add_system_with(MovementSystem::new);

        let entity = registry.create_entity();
        registry.add_component(entity, pos(0.0, 0.0)).unwrap();
        registry.add_component(entity, vel(1.0, 1.0)).unwrap();
        registry.kill_entity(entity).unwrap();
        registry.update_entities();

        assert!(registry.system::<MovementSystem>().unwrap().entities().is_empty());
        assert_eq!(registry.total_entities(), 0);
        assert!(!registry.pool::<Position>().unwrap().contains(entity.id()));
        assert!(!registry.pool::<Velocity>().unwrap().contains(entity.id()));
        assert_eq!(registry.create_entity(), entity);
    }

    #[test]
    #[should_panic(expected = "entity id space exhausted")]
    fn id_exhaustion_is_fatal() {
        let mut registry = Registry::new();
        registry.last_entity_number = EntityId::MAX;
        registry.create_entity();
    }

    #[test]
    fn pools_start_at_configured_capacity() {
        let mut registry = Registry::with_config(RegistryConfig {
            debug: false,
            base_pool_capacity: 16,
        });
        let entity = registry.create_entity();
        registry.add_component(entity, pos(0.0, 0.0)).unwrap();

        assert!(registry.pool::<Position>().unwrap().capacity() >= 16);
        let names: Vec<_> = registry.component_types().iter().map(|meta| meta.name).collect();
        assert_eq!(names, vec!["Position"]);
    }

    #[test]
    fn entity_mut_forwards_to_registry() {
        let mut registry = Registry::new();
        let container = registry.create_entity();

        let mut player = registry.spawn();
        player
            .add_component(pos(3.0, 4.0))
            .add_tag("players")
            .set_name("player1");
        player.set_parent(container).unwrap();
        assert_eq!(player.component_count(), 1);
        assert!(player.has_component::<Position>());
        assert_eq!(player.name(), Some("player1"));
        assert!(player.has_tag("players"));
        assert_eq!(player.parent(), Some(container));
        let id = player.entity();
        player.kill();

        assert!(registry.is_pending_kill(id));
        assert_eq!(registry.children_of(container), &[id]);
        registry.update_entities();
        assert!(registry.children_of(container).is_empty());
        assert!(registry.entity_mut(id).is_err());
    }
}
