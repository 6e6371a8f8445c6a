//! Effects module - side effects requested by the session
//!
//! The session never draws, plays audio or writes to disk. Each call returns
//! a list of [`Effect`]s; the host forwards them to a [`Presentation`] and
//! handles [`Effect::PersistHighScore`] itself.

use crate::types::{Block, BlockId, Phase, Quat, SoundCue, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Create or update a block (tower layer, mover or new fragment).
    RenderBlock { id: BlockId, block: Block },
    /// Move a fragment to the pose read back from physics.
    PoseFragment {
        id: BlockId,
        position: Vec3,
        orientation: Quat,
    },
    RemoveBlock { id: BlockId },
    SetScore(u32),
    SetHighScore(u32),
    PlaySound(SoundCue),
    PhaseChanged(Phase),
    /// A new best score to write to the high score store.
    PersistHighScore(u32),
}

/// Output-side seam: scene graph, HUD and audio.
pub trait Presentation {
    fn render_block(&mut self, id: BlockId, block: &Block);
    fn move_fragment(&mut self, id: BlockId, position: Vec3, orientation: Quat);
    fn remove_block(&mut self, id: BlockId);
    fn set_score(&mut self, score: u32);
    fn set_high_score(&mut self, high_score: u32);
    fn play_sound(&mut self, cue: SoundCue);

    fn set_phase(&mut self, _phase: Phase) {}
}

impl Effect {
    /// Forward to the matching presentation hook.
    ///
    /// `PersistHighScore` has no presentation hook and is ignored here.
    pub fn apply<P: Presentation + ?Sized>(&self, presentation: &mut P) {
        match *self {
            Effect::RenderBlock { id, ref block } => presentation.render_block(id, block),
            Effect::PoseFragment {
                id,
                position,
                orientation,
            } => presentation.move_fragment(id, position, orientation),
            Effect::RemoveBlock { id } => presentation.remove_block(id),
            Effect::SetScore(score) => presentation.set_score(score),
            Effect::SetHighScore(score) => presentation.set_high_score(score),
            Effect::PlaySound(cue) => presentation.play_sound(cue),
            Effect::PhaseChanged(phase) => presentation.set_phase(phase),
            Effect::PersistHighScore(_) => {}
        }
    }
}

/// Apply a batch of effects in order.
pub fn apply_all<P: Presentation + ?Sized>(effects: &[Effect], presentation: &mut P) {
    for effect in effects {
        effect.apply(presentation);
    }
}

/// Presentation that drops everything (headless runs, benchmarks).
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl Presentation for Headless {
    fn render_block(&mut self, _id: BlockId, _block: &Block) {}
    fn move_fragment(&mut self, _id: BlockId, _position: Vec3, _orientation: Quat) {}
    fn remove_block(&mut self, _id: BlockId) {}
    fn set_score(&mut self, _score: u32) {}
    fn set_high_score(&mut self, _high_score: u32) {}
    fn play_sound(&mut self, _cue: SoundCue) {}
}
