//! Terminal input module (engine-facing).
//!
//! Maps `crossterm` key and mouse events into the two discrete inputs the
//! game understands, [`crate::types::GameAction::Trigger`] and
//! [`crate::types::GameAction::Reset`]. Holding a key does nothing special:
//! every press is one action.

pub mod map;

pub use tui_stacker_types as types;

pub use map::{handle_key_event, handle_mouse_event, should_quit};
