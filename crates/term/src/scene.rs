//! Scene: the terminal side of the presentation seam.
//!
//! The session describes what changed through effects; the scene keeps a
//! mirror of every visible block plus the HUD values, and `GameView` draws
//! from that mirror.

use crate::core::Presentation;
use crate::types::{Block, BlockId, Phase, Quat, SoundCue, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBlock {
    pub id: BlockId,
    pub block: Block,
    pub orientation: Quat,
    /// Layer the block was created on; fixes its colour while it falls.
    pub layer: i32,
}

#[derive(Debug, Clone)]
pub struct Scene {
    /// Sorted by id (creation order).
    blocks: Vec<SceneBlock>,
    score: u32,
    high_score: u32,
    phase: Phase,
    last_cue: Option<SoundCue>,
    bell: bool,
    pending_bell: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            blocks: Vec::with_capacity(128),
            score: 0,
            high_score: 0,
            phase: Phase::Idle,
            last_cue: None,
            bell: false,
            pending_bell: false,
        }
    }

    /// Ring the terminal bell on sound cues.
    pub fn with_bell(mut self, bell: bool) -> Self {
        self.bell = bell;
        self
    }

    pub fn blocks(&self) -> &[SceneBlock] {
        &self.blocks
    }

    pub fn get(&self, id: BlockId) -> Option<&SceneBlock> {
        self.find(id).ok().map(|i| &self.blocks[i])
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_cue(&self) -> Option<SoundCue> {
        self.last_cue
    }

    /// Returns `true` once per cue when the bell is enabled.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.pending_bell)
    }

    /// Highest static block, used to aim the camera.
    pub fn top_y(&self) -> f32 {
        self.blocks
            .iter()
            .filter(|b| !b.block.is_dynamic())
            .map(|b| b.block.position.y)
            .fold(0.0, f32::max)
    }

    fn find(&self, id: BlockId) -> Result<usize, usize> {
        self.blocks.binary_search_by_key(&id, |b| b.id)
    }
}

impl Presentation for Scene {
    fn render_block(&mut self, id: BlockId, block: &Block) {
        match self.find(id) {
            Ok(i) => self.blocks[i].block = *block,
            Err(i) => self.blocks.insert(
                i,
                SceneBlock {
                    id,
                    block: *block,
                    orientation: Quat::IDENTITY,
                    layer: block.layer(),
                },
            ),
        }
    }

    fn move_fragment(&mut self, id: BlockId, position: Vec3, orientation: Quat) {
        if let Ok(i) = self.find(id) {
            self.blocks[i].block.position = position;
            self.blocks[i].orientation = orientation;
        }
    }

    fn remove_block(&mut self, id: BlockId) {
        if let Ok(i) = self.find(id) {
            self.blocks.remove(i);
        }
    }

    fn set_score(&mut self, score: u32) {
        self.score = score;
    }

    fn set_high_score(&mut self, high_score: u32) {
        self.high_score = high_score;
    }

    fn play_sound(&mut self, cue: SoundCue) {
        self.last_cue = Some(cue);
        if self.bell {
            self.pending_bell = true;
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}
