use crate::ecs::EntityId;
use thiserror::Error;

/// Precondition violations reported by the registry.
///
/// None of these are transient: they mean the caller used a stale handle or
/// asked for something it never set up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),

    #[error("entity {entity} has no '{component}' component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("system '{0}' is not registered")]
    MissingSystem(&'static str),

    #[error("cannot parent entity {child} under {parent}: the hierarchy would contain a cycle")]
    HierarchyCycle { child: EntityId, parent: EntityId },
}
