//! Engine - the concrete pieces behind the core's seams
//!
//! - [`physics`]: [`FallingWorld`], a small rigid-body integrator for fragments
//! - [`store`]: high score persistence ([`MemoryStore`], [`JsonFileStore`])
//! - [`runner`]: [`Runner`], which owns a session plus both of the above

pub mod physics;
pub mod runner;
pub mod store;

pub use physics::{Body, FallingWorld, WorldConfig, MAX_SUBSTEPS};
pub use runner::Runner;
pub use store::{HighScoreStore, JsonFileStore, MemoryStore, StoreError, HIGH_SCORE_VERSION};
