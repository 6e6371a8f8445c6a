//! Key and pointer mapping from terminal events to game actions.

use crate::types::{GameAction, Phase};
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

/// Map keyboard input to game actions.
pub fn handle_key_event(key: KeyEvent) -> Option<GameAction> {
    // Terminals with the kitty protocol report releases too; one press, one action.
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') | KeyCode::Up => Some(GameAction::Trigger),
        KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') => Some(GameAction::Reset),
        _ => None,
    }
}

/// Map a pointer press: one button does everything.
///
/// After game over a press starts a new run; otherwise it triggers.
pub fn handle_mouse_event(event: MouseEvent, phase: Phase) -> Option<GameAction> {
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(if phase == Phase::GameOver {
            GameAction::Reset
        } else {
            GameAction::Trigger
        }),
        _ => None,
    }
}

/// Check if key should quit the game.
pub fn should_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc)
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}
