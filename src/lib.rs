//! TUI Stacker (workspace facade crate).
//!
//! Re-exports the member crates under one roof so the binary, integration
//! tests and benches can use `tui_stacker::{core,engine,term,input,adapter,types}`.

pub use tui_stacker_adapter as adapter;
pub use tui_stacker_core as core;
pub use tui_stacker_engine as engine;
pub use tui_stacker_input as input;
pub use tui_stacker_term as term;
pub use tui_stacker_types as types;
