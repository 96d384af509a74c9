use crate::ecs::{System, SystemState};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

/// Systems keyed by concrete type, kept in registration order.
#[derive(Default)]
pub(crate) struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    lookup: HashMap<TypeId, usize>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `system`, replacing any system of the same type in place.
    ///
    /// Returns `true` when an existing system was replaced.
    pub fn insert<S: System>(&mut self, system: S) -> bool {
        self.insert_registered(RegisteredSystem {
            type_id: TypeId::of::<S>(),
            name: type_name::<S>(),
            system: Box::new(system),
        })
    }

    fn insert_registered(&mut self, registered: RegisteredSystem) -> bool {
        if let Some(&index) = self.lookup.get(&registered.type_id) {
            self.systems[index] = registered;
            return true;
        }
        self.lookup.insert(registered.type_id, self.systems.len());
        self.systems.push(registered);
        false
    }

    pub fn remove<S: System>(&mut self) -> Option<S> {
        let index = self.lookup.remove(&TypeId::of::<S>())?;
        let registered = self.systems.remove(index);
        for slot in self.lookup.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        registered.system.into_any().downcast::<S>().ok().map(|boxed| *boxed)
    }

    pub fn contains<S: System>(&self) -> bool {
        self.lookup.contains_key(&TypeId::of::<S>())
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        let index = *self.lookup.get(&TypeId::of::<S>())?;
        self.systems[index].system.as_any().downcast_ref::<S>()
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        let index = *self.lookup.get(&TypeId::of::<S>())?;
        self.systems[index].system.as_any_mut().downcast_mut::<S>()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.systems.iter().map(|registered| registered.name)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn System> {
        self.systems
            .iter_mut()
            .map(|registered| registered.system.as_system_mut())
    }

    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut SystemState> {
        self.iter_mut().map(|system| system.state_mut())
    }

    /// Move every system from `other` into `self`, replacing same-typed ones.
    pub fn absorb(&mut self, other: SystemRegistry) {
        for registered in other.systems {
            self.insert_registered(registered);
        }
    }
}

struct RegisteredSystem {
    type_id: TypeId,
    name: &'static str,
    system: Box<dyn AnySystem>,
}

/// Object-safe bridge giving both `dyn System` and `dyn Any` access to a
/// boxed system.
trait AnySystem {
    fn as_system_mut(&mut self) -> &mut dyn System;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<S: System> AnySystem for S {
    fn as_system_mut(&mut self) -> &mut dyn System {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
