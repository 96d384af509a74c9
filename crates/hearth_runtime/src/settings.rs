//! Runtime settings, loaded from an optional JSON file

use anyhow::{Context, Result};
use hearth_core::ecs::RegistryConfig;
use hearth_core::time::TICK_RATE_HZ;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Number of frames to simulate before exiting.
    pub frames: u64,
    pub tick_rate_hz: u32,
    pub registry: RegistryConfig,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            frames: 120,
            tick_rate_hz: TICK_RATE_HZ,
            registry: RegistryConfig::default(),
        }
    }
}

impl RuntimeSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing settings in {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
