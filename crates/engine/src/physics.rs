//! Falling-fragment physics
//!
//! Fragments never collide with anything: they fall under gravity and tumble
//! until the session culls them. That is all the game needs to sell the
//! effect, and it keeps a step allocation-free.

use tui_stacker_core::Physics;
use tui_stacker_types::{Block, BodyHandle, Quat, Vec3, BLOCK_HEIGHT, GRAVITY, PHYSICS_STEP_S};

/// Angular speed (rad/s) of a unit-mass fragment.
const TUMBLE_RATE: f32 = 6.0;

/// Initial outward drift (units/s) away from the tower axis.
const DRIFT_SPEED: f32 = 0.5;

/// Upper bound on sub-steps per `step` call. Time beyond
/// `max_step_s * MAX_SUBSTEPS` is dropped.
pub const MAX_SUBSTEPS: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub half_extents: Vec3,
}

impl Body {
    fn integrate(&mut self, gravity: f32, dt: f32) {
        self.velocity.y += gravity * dt;
        self.position += self.velocity * dt;

        let spin = Quat::from_scaled_axis(self.angular_velocity * dt);
        self.orientation = (spin * self.orientation).normalize();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub gravity: f32,
    /// Largest integration step in seconds.
    pub max_step_s: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            max_step_s: PHYSICS_STEP_S,
        }
    }
}

/// Handle-indexed arena of falling bodies.
///
/// Freed slots are recycled; a handle is only valid between
/// `add_fragment` and `remove_fragment`.
#[derive(Debug, Clone, Default)]
pub struct FallingWorld {
    config: WorldConfig,
    bodies: Vec<Option<Body>>,
    free: Vec<u32>,
}

impl FallingWorld {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: Vec::with_capacity(32),
            free: Vec::with_capacity(32),
        }
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.0 as usize).and_then(|b| b.as_ref())
    }

    /// Number of live bodies.
    pub fn len(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_body(block: &Block, mass: f32) -> Body {
        // Tip over the outer edge: spin about the horizontal axis
        // perpendicular to the direction away from the tower centre.
        let outward = Vec3::new(block.position.x, 0.0, block.position.z);
        let outward = if outward.length_squared() > f32::EPSILON {
            outward.normalize()
        } else {
            Vec3::X
        };
        let spin_axis = Vec3::Y.cross(outward);
        let mass = if mass > 0.0 { mass } else { 1.0 };

        Body {
            position: block.position,
            velocity: outward * DRIFT_SPEED,
            orientation: Quat::IDENTITY,
            angular_velocity: spin_axis * (TUMBLE_RATE / mass),
            mass,
            half_extents: Vec3::new(block.size_x, BLOCK_HEIGHT, block.size_z) * 0.5,
        }
    }
}

impl Physics for FallingWorld {
    fn add_fragment(&mut self, block: &Block, mass: f32) -> BodyHandle {
        let body = Self::spawn_body(block, mass);
        if let Some(slot) = self.free.pop() {
            self.bodies[slot as usize] = Some(body);
            return BodyHandle(slot);
        }
        self.bodies.push(Some(body));
        BodyHandle(self.bodies.len() as u32 - 1)
    }

    fn remove_fragment(&mut self, body: BodyHandle) {
        if let Some(slot) = self.bodies.get_mut(body.0 as usize) {
            if slot.take().is_some() {
                self.free.push(body.0);
            }
        }
    }

    fn step(&mut self, dt_s: f32) {
        if !(dt_s > 0.0) {
            return;
        }
        let max = self.config.max_step_s.max(f32::EPSILON);
        let mut remaining = dt_s.min(max * MAX_SUBSTEPS as f32);
        for _ in 0..MAX_SUBSTEPS {
            if remaining <= 0.0 {
                break;
            }
            let h = remaining.min(max);
            for body in self.bodies.iter_mut().flatten() {
                body.integrate(self.config.gravity, h);
            }
            remaining -= h;
        }
    }

    fn position(&self, body: BodyHandle) -> Option<Vec3> {
        self.body(body).map(|b| b.position)
    }

    fn orientation(&self, body: BodyHandle) -> Option<Quat> {
        self.body(body).map(|b| b.orientation)
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.free.clear();
    }
}
