use crate::ecs::{Entity, Registry, Signature};
use std::collections::HashMap;

/// Component requirements of a system plus the entities currently matching
/// them.
///
/// Membership is maintained by the registry at flush time only, so the list
/// can lag behind component changes made during a frame.
#[derive(Debug, Default)]
pub struct SystemState {
    signature: Signature,
    entities: Vec<Entity>,
    slots: HashMap<Entity, usize>,
}

impl SystemState {
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            entities: Vec::new(),
            slots: HashMap::new(),
        }
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Tracked entities. Order is insertion order until a removal swaps
    /// the last entity into the freed position.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.slots.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Start tracking `entity`. Returns `false` if it was already tracked.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if self.slots.contains_key(&entity) {
            return false;
        }
        self.slots.insert(entity, self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Stop tracking `entity`. Returns `false` if it was not tracked.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.slots.remove(&entity) else {
            return false;
        };
        self.entities.swap_remove(slot);
        if let Some(&moved) = self.entities.get(slot) {
            self.slots.insert(moved, slot);
        }
        true
    }
}

/// Per-frame logic over the entities matching a signature.
///
/// Implementors embed a [`SystemState`] and expose it through `state` /
/// `state_mut`. Both hooks receive the registry so they can read and write
/// components; structural changes they make (creating, killing) only reach
/// system membership at the next [`Registry::update_entities`].
///
/// # Example
/// ```ignore
/// struct GravitySystem { state: SystemState }
///
/// impl System for GravitySystem {
///     fn state(&self) -> &SystemState { &self.state }
///     fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
///
///     fn update(&mut self, registry: &mut Registry, dt: f64) {
///         for &entity in self.state.entities() {
///             if let Ok(velocity) = registry.component_mut::<Velocity>(entity) {
///                 velocity.y -= 9.81 * dt as f32;
///             }
///         }
///     }
/// }
/// ```
pub trait System: 'static {
    fn state(&self) -> &SystemState;

    fn state_mut(&mut self) -> &mut SystemState;

    fn update(&mut self, registry: &mut Registry, dt: f64) {
        let _ = (registry, dt);
    }

    fn render(&mut self, registry: &mut Registry) {
        let _ = registry;
    }

    fn signature(&self) -> &Signature {
        self.state().signature()
    }

    fn entities(&self) -> &[Entity] {
        self.state().entities()
    }
}
