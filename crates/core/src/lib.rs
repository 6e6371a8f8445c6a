//! Core game logic module - pure, deterministic, and testable
//!
//! This module contains the stacking rules, the tower record and the session
//! state machine. It has **no dependencies** on terminals, networking or the
//! filesystem:
//!
//! - **Deterministic**: the same inputs and tick lengths produce the same run
//! - **Testable**: physics and presentation are traits, so tests swap in doubles
//! - **Portable**: runs headless for benchmarks and remote controllers
//!
//! # Module Structure
//!
//! - [`geometry`]: overlap measurement, classification and trimming
//! - [`tower`]: placed layers and live fragments
//! - [`game_state`]: the session state machine and deferred game over
//! - [`scoring`]: placement points and mover speed
//! - [`effects`]: side effects and the [`Presentation`] seam
//! - [`physics`]: the [`Physics`] seam
//! - [`snapshot`]: copyable view of the session for renderers and observers
//!
//! # Game Rules
//!
//! - A block slides in along `x` or `z` from off the tower; the player stops
//!   it with a trigger. Axes alternate layer by layer.
//! - The part hanging over the block below is cut off and falls.
//! - An overlap above 95% snaps into place untrimmed for a bonus.
//! - No overlap at all, or letting the block run too far, ends the run.
//!
//! # Example
//!
//! ```
//! use tui_stacker_core::{GameSession, Physics};
//! use tui_stacker_core::types::{Block, BodyHandle, Phase, Placement, Quat, Vec3};
//!
//! // A physics backend where nothing ever moves.
//! struct Frozen(Vec<Vec3>);
//!
//! impl Physics for Frozen {
//!     fn add_fragment(&mut self, block: &Block, _mass: f32) -> BodyHandle {
//!         self.0.push(block.position);
//!         BodyHandle(self.0.len() as u32 - 1)
//!     }
//!     fn remove_fragment(&mut self, _body: BodyHandle) {}
//!     fn step(&mut self, _dt_s: f32) {}
//!     fn position(&self, body: BodyHandle) -> Option<Vec3> {
//!         self.0.get(body.0 as usize).copied()
//!     }
//!     fn orientation(&self, _body: BodyHandle) -> Option<Quat> {
//!         Some(Quat::IDENTITY)
//!     }
//!     fn clear(&mut self) {
//!         self.0.clear();
//!     }
//! }
//!
//! let mut physics = Frozen(Vec::new());
//! let mut game = GameSession::new(0);
//!
//! // The first trigger starts a run.
//! game.trigger(&mut physics);
//! assert_eq!(game.phase(), Phase::Running);
//!
//! // Land one unit off center: trimmed, one point.
//! assert_eq!(game.place_at(1.0, &mut physics), Ok(Placement::Partial));
//! assert_eq!(game.score(), 1);
//! ```
//!
//! # Timing
//!
//! The session uses the elapsed time passed to
//! [`GameSession::tick`](game_state::GameSession::tick):
//! - **Mover**: advances `speed` units per 16ms, scaled by elapsed time
//! - **Physics**: stepped once per tick with the elapsed seconds
//! - **Game over**: 1000ms after the fail, unless a reset came first

pub mod effects;
pub mod game_state;
pub mod geometry;
pub mod physics;
pub mod scoring;
pub mod snapshot;
pub mod tower;

pub use tui_stacker_types as types;

// Re-export commonly used types for convenience
pub use effects::{apply_all, Effect, Headless, Presentation};
pub use game_state::{GameSession, Mover, PlaceError, SessionConfig};
pub use geometry::{Overlap, Resolution, Split};
pub use physics::{fragment_mass, Physics};
pub use scoring::{mover_speed, placement_score};
pub use snapshot::GameSnapshot;
pub use tower::{Fragment, Layer, Tower};
