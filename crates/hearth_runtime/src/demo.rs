// demo.rs - Headless example scene
//
// A container entity with four tagged players parented to it. Every player
// carries a transform, a sprite and a box collider; player1 also follows
// the camera. Each frame player3 walks right at 30 units per second and the
// render system records one draw call per sprite.

use glam::Vec2;
use hearth_core::define_component;
use hearth_core::ecs::{ComponentTypeRegistry, Entity, Registry, RegistryError, System, SystemState};
use hearth_core::scene::Scene;
use tracing::{info, trace};

const PLAYER3_SPEED: f32 = 30.0;

// ============================================================================
// Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub scale: Vec2,
    /// Degrees.
    pub rotation: f32,
}

impl Transform {
    pub fn new(position: Vec2, scale: Vec2, rotation: f32) -> Self {
        Self {
            position,
            scale,
            rotation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec2::ZERO, Vec2::ONE, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub texture: String,
}

impl Sprite {
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraFollow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCollider {
    pub size: Vec2,
}

impl BoxCollider {
    pub fn square(side: f32) -> Self {
        Self {
            size: Vec2::splat(side),
        }
    }
}

define_component!(Transform);
define_component!(Sprite);
define_component!(CameraFollow);
define_component!(BoxCollider);

// ============================================================================
// Systems
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub entity: Entity,
    pub texture: String,
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
}

/// Collects one draw call per entity with a transform and a sprite.
pub struct RenderSystem {
    state: SystemState,
    frame: Vec<DrawCall>,
    total_draws: u64,
}

impl RenderSystem {
    pub fn new(types: &mut ComponentTypeRegistry) -> Self {
        Self {
            state: SystemState::new(types.signature_of::<(Transform, Sprite)>()),
            frame: Vec::new(),
            total_draws: 0,
        }
    }

    /// Draw calls of the most recent render pass.
    pub fn last_frame(&self) -> &[DrawCall] {
        &self.frame
    }

    pub fn total_draws(&self) -> u64 {
        self.total_draws
    }
}

impl System for RenderSystem {
    fn state(&self) -> &SystemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    fn render(&mut self, registry: &mut Registry) {
        self.frame.clear();
        for &entity in self.state.entities() {
            let (Ok(transform), Ok(sprite)) = (
                registry.component::<Transform>(entity),
                registry.component::<Sprite>(entity),
            ) else {
                continue;
            };
            trace!(entity = entity.id(), texture = %sprite.texture, x = transform.position.x, y = transform.position.y, "draw");
            self.frame.push(DrawCall {
                entity,
                texture: sprite.texture.clone(),
                position: transform.position,
                scale: transform.scale,
                rotation: transform.rotation,
            });
        }
        self.total_draws += self.frame.len() as u64;
    }
}

// ============================================================================
// Scene
// ============================================================================

#[derive(Default)]
pub struct DemoScene {
    player3: Option<Entity>,
}

impl DemoScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player3(&self) -> Option<Entity> {
        self.player3
    }
}

impl Scene for DemoScene {
    fn initialize(&mut self, registry: &mut Registry) -> Result<(), RegistryError> {
        registry.add_system_with(RenderSystem::new);

        let container = registry.create_entity();
        registry.set_name(container, "playerContainer")?;

        let players = [
            (Transform::default(), "forx.png", 50.0),
            (Transform::new(Vec2::new(400.0, 400.0), Vec2::ONE, 21.0), "forx.png", 50.0),
            (Transform::new(Vec2::new(-400.0, -400.0), Vec2::ONE, 57.0), "lwjgl.jpg", 75.0),
            (Transform::default(), "lwjgl.jpg", 80.0),
        ];

        for (index, (transform, texture, collider)) in players.into_iter().enumerate() {
            let mut player = registry.spawn();
            player
                .add_component(transform)
                .add_component(Sprite::new(texture))
                .add_component(BoxCollider::square(collider))
                .add_tag("players")
                .set_name(format!("player{}", index + 1));
            if index == 0 {
                player.add_component(CameraFollow);
            }
            player.set_parent(container)?;

            if index == 2 {
                self.player3 = Some(player.entity());
            }
        }
        Ok(())
    }

    fn update(&mut self, registry: &mut Registry, dt: f64) {
        let Some(player3) = self.player3 else {
            return;
        };
        if let Ok(transform) = registry.component_mut::<Transform>(player3) {
            transform.position.x += PLAYER3_SPEED * dt as f32;
        }
    }

    fn destroy(&mut self, registry: &mut Registry) {
        if let Ok(render) = registry.system::<RenderSystem>() {
            info!(total_draws = render.total_draws(), "render system shut down");
        }
        self.player3 = None;
    }
}
