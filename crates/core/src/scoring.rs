//! Scoring module - placement points and mover speed
//!
//! A perfect match is worth [`PERFECT_BONUS`], any other landing
//! [`PLACE_SCORE`], a miss nothing. The mover speeds up slightly with every
//! layer so tall towers get harder.

use crate::types::{Placement, PERFECT_BONUS, PLACE_SCORE, TICK_MS};

/// Points awarded for a placement.
pub fn placement_score(placement: Placement) -> u32 {
    match placement {
        Placement::Perfect => PERFECT_BONUS,
        Placement::Partial => PLACE_SCORE,
        Placement::Miss => 0,
    }
}

/// Mover advance per [`TICK_MS`] step for a tower of `height` layers.
pub fn mover_speed(height: usize, base_speed: f32, ramp: f32) -> f32 {
    base_speed + height as f32 * ramp
}

/// Distance covered in `elapsed_ms` at `speed` units per step.
///
/// Scaling by elapsed time keeps the mover rate independent of the frame
/// rate; one [`TICK_MS`] tick advances exactly `speed`.
pub fn step_advance(speed: f32, elapsed_ms: u32) -> f32 {
    speed * elapsed_ms as f32 / TICK_MS as f32
}

/// Whether `score` should replace the stored best.
pub fn beats_high_score(score: u32, high_score: u32) -> bool {
    score > high_score
}
