// component.rs - Component type registration
//
// Components are identified by small dense u32 IDs handed out on first use,
// not by Rust TypeIds. Pools and signature bits are indexed by that ID.

use crate::ecs::Signature;
use std::any::TypeId;
use std::collections::HashMap;
use std::mem::{align_of, size_of};

pub type ComponentId = u32;

/// Metadata describing a registered component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
}

/// Trait for data that can be attached to an entity.
///
/// Components own no behavior; systems read and write them through the
/// registry. Use [`define_component!`](crate::define_component) to implement
/// it with a readable name for trace output.
pub trait Component: 'static {
    /// Human-readable name for debugging.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Helper macro to implement the Component trait.
///
/// # Example
/// ```ignore
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position);
/// define_component!(Velocity, "velocity");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty) => {
        impl $crate::ecs::Component for $ty {
            fn name() -> &'static str {
                stringify!($ty)
            }
        }
    };
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            fn name() -> &'static str {
                $name
            }
        }
    };
}

/// Hands out a stable ID to each component type the first time it is seen.
///
/// IDs are dense (`0, 1, 2, ...`) in first-use order and stay fixed for the
/// lifetime of the owning registry. They are not stable across runs.
#[derive(Debug, Default)]
pub struct ComponentTypeRegistry {
    ids: HashMap<TypeId, ComponentId>,
    metas: Vec<ComponentMeta>,
}

impl ComponentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the ID for `T`, allocating the next free one on first use.
    pub fn id_for<T: Component>(&mut self) -> ComponentId {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return id;
        }

        let id = self.metas.len() as ComponentId;
        self.ids.insert(TypeId::of::<T>(), id);
        self.metas.push(ComponentMeta {
            id,
            name: T::name(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        });
        id
    }

    /// Look up the ID for `T` without registering it.
    pub fn lookup<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Look up component metadata by ID.
    pub fn meta(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.metas.get(id as usize)
    }

    /// Name of a registered component, or `"<unregistered>"`.
    pub fn name_of(&self, id: ComponentId) -> &'static str {
        self.meta(id).map_or("<unregistered>", |meta| meta.name)
    }

    /// Number of component types registered so far.
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// All registered component types in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.iter()
    }

    /// Build the signature covering every component type in `S`,
    /// registering any type not seen before.
    pub fn signature_of<S: ComponentSet>(&mut self) -> Signature {
        let mut signature = Signature::new();
        for id in S::component_ids(self) {
            signature.insert(id);
        }
        signature
    }
}

/// A tuple of component types, used to describe system requirements.
pub trait ComponentSet {
    fn component_ids(types: &mut ComponentTypeRegistry) -> Vec<ComponentId>;
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn component_ids(types: &mut ComponentTypeRegistry) -> Vec<ComponentId> {
                vec![$(types.id_for::<$ty>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
