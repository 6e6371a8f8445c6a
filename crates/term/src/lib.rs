//! Terminal "game renderer" module.
//!
//! A small, game-oriented rendering layer for terminal play. It avoids
//! widget toolkits and renders into a plain framebuffer that is diff-flushed
//! to the terminal.
//!
//! - [`scene`]: mirror of the visible blocks, fed by session effects
//! - [`game_view`]: projects the scene into front and side elevations
//! - [`fb`]: framebuffer and colours
//! - [`renderer`]: crossterm backend

pub mod fb;
pub mod game_view;
pub mod renderer;
pub mod scene;

pub use tui_stacker_core as core;
pub use tui_stacker_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use game_view::{layer_color, AdapterStatusView, GameView, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
pub use scene::{Scene, SceneBlock};
