//! Registry configuration

use serde::{Deserialize, Serialize};

/// Initial capacity of each component pool.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Settings fixed when a registry is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Emit lifecycle trace lines (entity created/killed, component
    /// added/removed, system added/removed).
    pub debug: bool,
    pub base_pool_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            debug: false,
            base_pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}
