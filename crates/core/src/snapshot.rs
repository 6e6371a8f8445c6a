use crate::types::{Block, LastPlacement, Phase};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSnapshot {
    pub phase: Phase,
    /// Run counter; bumped by every reset.
    pub generation: u64,
    pub score: u32,
    pub high_score: u32,
    /// Static layers, base included.
    pub tower_height: u32,
    pub top: Option<Block>,
    pub mover: Option<Block>,
    /// Live fragments still being simulated.
    pub fragments: u32,
    pub last_placement: Option<LastPlacement>,
    /// Session clock in milliseconds (advances only in live phases).
    pub clock_ms: u64,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn playable(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            score: 0,
            high_score: 0,
            tower_height: 0,
            top: None,
            mover: None,
            fragments: 0,
            last_placement: None,
            clock_ms: 0,
        }
    }
}
