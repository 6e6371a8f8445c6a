//! Tower module - ordered record of placed layers plus live fragments
//!
//! Layers are kept bottom to top; the last entry is the reference block for
//! the next placement. Fragments are stored alongside so a reset can tear
//! the whole run down in one pass.

use crate::types::{BlockId, BodyHandle, Block, Quat};

/// A placed, static layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub id: BlockId,
    pub block: Block,
}

/// A falling piece owned by the physics adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub id: BlockId,
    pub body: BodyHandle,
    /// Footprint with the last position read back from physics.
    pub block: Block,
    pub orientation: Quat,
}

#[derive(Debug, Clone, Default)]
pub struct Tower {
    layers: Vec<Layer>,
    fragments: Vec<Fragment>,
}

impl Tower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(layers: usize) -> Self {
        Self {
            layers: Vec::with_capacity(layers),
            fragments: Vec::with_capacity(layers),
        }
    }

    /// Number of static layers, base included.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn top(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// `y` of the top layer, or zero for an empty tower.
    pub fn top_y(&self) -> f32 {
        self.top().map(|l| l.block.position.y).unwrap_or(0.0)
    }

    /// Append a layer.
    ///
    /// Returns `false` (and leaves the tower untouched) for degenerate or
    /// dynamic blocks.
    pub fn push(&mut self, id: BlockId, block: Block) -> bool {
        if !block.is_valid() || block.is_dynamic() {
            return false;
        }
        self.layers.push(Layer { id, block });
        true
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragments_mut(&mut self) -> &mut [Fragment] {
        &mut self.fragments
    }

    pub fn add_fragment(&mut self, id: BlockId, body: BodyHandle, block: Block) {
        self.fragments.push(Fragment {
            id,
            body,
            block,
            orientation: Quat::IDENTITY,
        });
    }

    /// Keep only the fragments for which `keep` returns `true`.
    pub fn retain_fragments(&mut self, mut keep: impl FnMut(&Fragment) -> bool) {
        self.fragments.retain(|f| keep(f));
    }

    /// Drop every layer and fragment, reporting each one to `removed`.
    ///
    /// Fragments are reported with their body handle so the caller can
    /// release them from the physics world.
    pub fn clear(&mut self, mut removed: impl FnMut(BlockId, Option<BodyHandle>)) {
        for f in self.fragments.drain(..) {
            removed(f.id, Some(f.body));
        }
        for l in self.layers.drain(..) {
            removed(l.id, None);
        }
    }
}
