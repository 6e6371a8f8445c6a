//! Geometry module - overlap measurement and trimming
//!
//! Pure functions over two footprints and a movement axis. Nothing here
//! touches the tower or the physics world; callers decide what to do with
//! the results.
//!
//! Coordinates along the movement axis:
//!
//! ```text
//!        previous  |=========|
//!        mover          |=========|
//!                  <----> delta
//!        kept           |====|
//!        fragment            |====|
//! ```

use crate::types::{Axis, Block, Placement, PERFECT_RATIO};

/// Overlap between the mover and the block below it, along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// Signed offset `mover - previous`.
    pub delta: f32,
    /// `|delta|`: the length that hangs over the edge.
    pub drop_size: f32,
    /// `moving_size - drop_size`; zero or negative means no contact.
    pub overlap_size: f32,
    /// Size of the mover along the axis.
    pub moving_size: f32,
}

impl Overlap {
    pub fn measure(mover: &Block, previous: &Block, axis: Axis) -> Self {
        let moving_size = mover.size_along(axis);
        let delta = mover.position_along(axis) - previous.position_along(axis);
        let drop_size = delta.abs();
        Self {
            delta,
            drop_size,
            overlap_size: moving_size - drop_size,
            moving_size,
        }
    }

    /// Classify the overlap. First match wins: perfect, partial, miss.
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_stacker_core::geometry::Overlap;
    /// use tui_stacker_core::types::{Axis, Block, Placement, Vec3};
    ///
    /// let previous = Block::new(Vec3::new(0.0, 1.0, 0.0), 3.0, 3.0, None);
    /// let mover = Block::new(Vec3::new(1.0, 2.0, 0.0), 3.0, 3.0, Some(Axis::X));
    /// assert_eq!(Overlap::measure(&mover, &previous, Axis::X).classify(), Placement::Partial);
    /// ```
    pub fn classify(&self) -> Placement {
        if self.overlap_size > PERFECT_RATIO * self.moving_size {
            Placement::Perfect
        } else if self.overlap_size > 0.0 {
            Placement::Partial
        } else {
            // Also catches NaN, since every comparison above is false.
            Placement::Miss
        }
    }
}

/// Result of trimming a mover against the block below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// Retained portion, re-centered over the overlapping region.
    pub kept: Block,
    /// Clipped remainder, flagged dynamic.
    pub fragment: Block,
}

/// Trim the mover to the overlapping region.
///
/// Returns `None` when either piece would be degenerate (size zero,
/// negative or non-finite); callers treat that as a miss.
pub fn split(mover: &Block, axis: Axis, overlap: &Overlap) -> Option<Split> {
    let kept_size = overlap.overlap_size;
    let fragment_size = overlap.moving_size - kept_size;
    if !(kept_size > 0.0 && fragment_size > 0.0) {
        return None;
    }

    let kept_center = mover.position_along(axis) - overlap.delta / 2.0;
    let kept = mover
        .with_size_along(axis, kept_size)
        .with_position_along(axis, kept_center);

    // The fragment abuts the kept block on the overhanging side.
    let offset = (kept_size / 2.0 + fragment_size / 2.0) * overlap.delta.signum();
    let fragment = mover
        .with_size_along(axis, fragment_size)
        .with_position_along(axis, kept_center + offset)
        .into_dynamic();

    if !kept.is_valid() || !fragment.is_valid() {
        return None;
    }
    Some(Split { kept, fragment })
}

/// Align the mover with the block below, removing accumulated drift.
pub fn snap(mover: &Block, previous: &Block, axis: Axis) -> Block {
    mover.with_position_along(axis, previous.position_along(axis))
}

/// Outcome of a placement, ready to apply to the tower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Perfect { placed: Block },
    Partial(Split),
    Miss,
}

impl Resolution {
    pub fn placement(&self) -> Placement {
        match self {
            Resolution::Perfect { .. } => Placement::Perfect,
            Resolution::Partial(_) => Placement::Partial,
            Resolution::Miss => Placement::Miss,
        }
    }
}

/// Measure, classify and trim in one go.
pub fn resolve(mover: &Block, previous: &Block, axis: Axis) -> (Overlap, Resolution) {
    let overlap = Overlap::measure(mover, previous, axis);
    let resolution = match overlap.classify() {
        Placement::Perfect => Resolution::Perfect {
            placed: snap(mover, previous, axis),
        },
        Placement::Partial => match split(mover, axis, &overlap) {
            Some(s) => Resolution::Partial(s),
            None => Resolution::Miss,
        },
        Placement::Miss => Resolution::Miss,
    };
    (overlap, resolution)
}
