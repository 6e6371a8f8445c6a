//! Physics seam - the session hands fragments over and reads poses back
//!
//! The core only needs four things from a physics backend: accept a falling
//! block, forget it, advance time, and report where a body is. The engine
//! crate ships a small rigid-body integrator; tests use scripted doubles.

use crate::types::{Block, BodyHandle, Quat, Vec3};

pub trait Physics {
    /// Register a dynamic body for `block` with the given mass.
    fn add_fragment(&mut self, block: &Block, mass: f32) -> BodyHandle;

    /// Forget a body. Unknown handles are ignored.
    fn remove_fragment(&mut self, body: BodyHandle);

    /// Advance the simulation by `dt_s` seconds.
    fn step(&mut self, dt_s: f32);

    fn position(&self, body: BodyHandle) -> Option<Vec3>;

    fn orientation(&self, body: BodyHandle) -> Option<Quat>;

    /// Drop every body.
    fn clear(&mut self);
}

/// Mass of a fragment: heavier for larger footprints.
pub fn fragment_mass(block: &Block) -> f32 {
    1.0 + block.footprint_area()
}
