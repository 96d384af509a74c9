//! Scenes and the frame loop that drives them
//!
//! A scene populates a registry once and then gets per-frame hooks that run
//! after the registry's own systems. [`SceneHost`] owns the pairing and
//! fixes the order of a frame:
//!
//! 1. flush created/killed entities
//! 2. system `update`, then scene `update`
//! 3. system `render`, then scene `render`

use crate::ecs::{Registry, RegistryConfig, RegistryError};
use tracing::{debug, info};

pub trait Scene {
    /// Create the scene's entities and register its systems.
    fn initialize(&mut self, registry: &mut Registry) -> Result<(), RegistryError>;

    fn update(&mut self, registry: &mut Registry, dt: f64) {
        let _ = (registry, dt);
    }

    fn render(&mut self, registry: &mut Registry) {
        let _ = registry;
    }

    /// Called once when the host is finished, before the registry is dropped.
    fn destroy(&mut self, registry: &mut Registry) {
        let _ = registry;
    }
}

/// Owns a scene together with the registry it lives in.
pub struct SceneHost<S: Scene> {
    scene: S,
    registry: Registry,
    frames: u64,
}

impl<S: Scene> SceneHost<S> {
    /// Build a fresh registry from `config` and initialize `scene` in it.
    pub fn new(mut scene: S, config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut registry = Registry::with_config(config);
        scene.initialize(&mut registry)?;
        info!(
            entities = registry.total_entities(),
            systems = registry.system_count(),
            "scene initialized"
        );

        Ok(Self {
            scene,
            registry,
            frames: 0,
        })
    }

    /// Run one frame with timestep `dt` (seconds).
    pub fn frame(&mut self, dt: f64) {
        self.registry.update_entities();

        self.registry.update(dt);
        self.scene.update(&mut self.registry, dt);

        self.registry.render();
        self.scene.render(&mut self.registry);

        self.frames += 1;
        if self.registry.config().debug {
            debug!(frame = self.frames, dt, "frame complete");
        }
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Tear the scene down. Returns it so callers can inspect final state.
    pub fn finish(mut self) -> S {
        self.scene.destroy(&mut self.registry);
        info!(frames = self.frames, "scene finished");
        self.scene
    }
}
