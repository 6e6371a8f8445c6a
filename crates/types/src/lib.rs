//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the application.
//! Everything here is plain data: the gameplay core, the terminal view and the
//! remote-control protocol all speak in these terms.
//!
//! # World Coordinates
//!
//! The tower grows along `y`; one layer is one world unit tall, so a block's
//! `y` coordinate is its layer index. Blocks slide along either `x` or `z`.
//!
//! - **Base**: two 3x3 static layers centered on the origin
//! - **Spawn**: a new mover starts at `-10` on its movement axis
//! - **Runaway**: a mover more than `10` units past the block below fails
//!
//! # Tuning Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `BASE_SPEED` | 0.15 | Mover advance per step |
//! | `SPEED_RAMP_PER_LAYER` | 0.001 | Extra advance per step for each tower layer |
//! | `PERFECT_RATIO` | 0.95 | Overlap share that counts as a perfect match |
//! | `PERFECT_BONUS` | 5 | Points for a perfect match |
//! | `PLACE_SCORE` | 1 | Points for a trimmed placement |
//! | `RUNAWAY_LIMIT` | 10.0 | Max offset past the block below |
//! | `GAME_OVER_DELAY_MS` | 1000 | Fall animation time before game over |
//! | `GRAVITY` | -10.0 | Downward acceleration for fragments |
//!
//! # Examples
//!
//! ```
//! use tui_stacker_types::{Axis, Block, GameAction, Vec3, BASE_SIZE};
//!
//! // Movement axes alternate layer by layer.
//! assert_eq!(Axis::X.other(), Axis::Z);
//!
//! // A base layer has no movement axis.
//! let base = Block::new(Vec3::ZERO, BASE_SIZE, BASE_SIZE, None);
//! assert!(base.is_valid());
//! assert_eq!(base.footprint_area(), 9.0);
//!
//! // Parse a remote action.
//! assert_eq!(GameAction::from_str("trigger"), Some(GameAction::Trigger));
//! ```

pub use glam::{Quat, Vec3};

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Width and depth of the base layers.
pub const BASE_SIZE: f32 = 3.0;

/// Height of every block (one layer).
pub const BLOCK_HEIGHT: f32 = 1.0;

/// Number of static layers laid down at the start of a run.
pub const BASE_LAYERS: usize = 2;

/// Off-tower coordinate a new mover starts from along its movement axis.
pub const SPAWN_COORDINATE: f32 = -10.0;

/// Mover advance per simulation step at tower height zero.
pub const BASE_SPEED: f32 = 0.15;

/// Additional advance per step for every layer in the tower.
pub const SPEED_RAMP_PER_LAYER: f32 = 0.001;

/// An overlap above this share of the mover's size snaps to a perfect match.
pub const PERFECT_RATIO: f32 = 0.95;

/// Points for a perfect match.
pub const PERFECT_BONUS: u32 = 5;

/// Points for a trimmed placement.
pub const PLACE_SCORE: u32 = 1;

/// Maximum offset past the block below before the mover counts as a miss.
pub const RUNAWAY_LIMIT: f32 = 10.0;

/// Delay between a fail event and the game-over state.
pub const GAME_OVER_DELAY_MS: u32 = 1000;

/// Downward acceleration applied to falling fragments.
pub const GRAVITY: f32 = -10.0;

/// Largest physics sub-step in seconds.
pub const PHYSICS_STEP_S: f32 = 1.0 / 60.0;

/// Fragments further than this below the tower top are discarded.
pub const FRAGMENT_CULL_DEPTH: f32 = 40.0;


/// Horizontal axis a mover slides along.
///
/// Layers alternate: a block that moved along `X` is followed by one that
/// moves along `Z`, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    /// The movement axis of the next layer.
    pub fn other(&self) -> Self {
        match self {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// Parse axis from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_stacker_types::Axis;
    ///
    /// assert_eq!(Axis::from_str("x"), Some(Axis::X));
    /// assert_eq!(Axis::from_str("Z"), Some(Axis::Z));
    /// assert_eq!(Axis::from_str("y"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "x" => Some(Axis::X),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Z => "z",
        }
    }
}

/// Whether a block rests in the tower or is owned by the physics simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Tower layer or active mover; never simulated.
    Static,
    /// Falling fragment; simulated until culled.
    Dynamic,
}

/// A rectangular prism one layer tall.
///
/// `position` is the center of the block. `axis` is the movement axis the
/// block had while it was the mover (`None` for base layers).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub position: Vec3,
    pub size_x: f32,
    pub size_z: f32,
    pub axis: Option<Axis>,
    pub kind: BlockKind,
}

impl Block {
    /// Create a static block.
    pub fn new(position: Vec3, size_x: f32, size_z: f32, axis: Option<Axis>) -> Self {
        Self {
            position,
            size_x,
            size_z,
            axis,
            kind: BlockKind::Static,
        }
    }

    /// Same footprint, flagged for physics simulation.
    pub fn into_dynamic(self) -> Self {
        Self {
            kind: BlockKind::Dynamic,
            ..self
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == BlockKind::Dynamic
    }

    pub fn size_along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.size_x,
            Axis::Z => self.size_z,
        }
    }

    pub fn position_along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.position.x,
            Axis::Z => self.position.z,
        }
    }

    pub fn with_position_along(mut self, axis: Axis, value: f32) -> Self {
        match axis {
            Axis::X => self.position.x = value,
            Axis::Z => self.position.z = value,
        }
        self
    }

    pub fn with_size_along(mut self, axis: Axis, value: f32) -> Self {
        match axis {
            Axis::X => self.size_x = value,
            Axis::Z => self.size_z = value,
        }
        self
    }

    /// Layer index (the rounded `y` coordinate).
    pub fn layer(&self) -> i32 {
        self.position.y.round() as i32
    }

    pub fn footprint_area(&self) -> f32 {
        self.size_x * self.size_z
    }

    /// Both sizes are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.size_x.is_finite() && self.size_z.is_finite() && self.size_x > 0.0 && self.size_z > 0.0
    }
}

/// Stable identifier for anything the presentation layer draws.
///
/// Ids are handed out monotonically and never reused, so a stale id from a
/// previous run can never alias a live block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u64);

/// Handle to a fragment body owned by the physics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u32);

/// Game lifecycle phase.
///
/// ```text
/// Idle --trigger--> Running --trigger--> Placing --hit--> Running
///                      |                    \--miss--> Failing
///                      \--runaway--> Failing --delay--> GameOver --reset--> Running
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the first run.
    Idle,
    /// Mover active, waiting for a trigger.
    Running,
    /// Trigger received; only observable while a placement resolves.
    Placing,
    /// The mover fell; game over is pending behind the fall delay.
    Failing,
    /// Terminal until reset.
    GameOver,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Placing => "placing",
            Phase::Failing => "failing",
            Phase::GameOver => "gameOver",
        }
    }

    /// Fragments are simulated and the clock advances.
    pub fn is_live(&self) -> bool {
        matches!(self, Phase::Running | Phase::Placing | Phase::Failing)
    }
}

/// Discrete input events.
///
/// Device mapping (key, pointer, remote command) lives outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Start a run, or place the mover.
    Trigger,
    /// Abandon the current run and start a new one.
    Reset,
}

impl GameAction {
    /// Parse action from string (for the remote protocol)
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_stacker_types::GameAction;
    ///
    /// assert_eq!(GameAction::from_str("trigger"), Some(GameAction::Trigger));
    /// assert_eq!(GameAction::from_str("Reset"), Some(GameAction::Reset));
    /// assert_eq!(GameAction::from_str("hardDrop"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trigger" => Some(GameAction::Trigger),
            "reset" => Some(GameAction::Reset),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::Trigger => "trigger",
            GameAction::Reset => "reset",
        }
    }
}

/// How a placement resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Overlap above the perfect ratio: snapped, full size kept.
    Perfect,
    /// Overlapping but trimmed: a fragment falls.
    Partial,
    /// No overlap: the whole mover falls and the run ends.
    Miss,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Perfect => "perfect",
            Placement::Partial => "partial",
            Placement::Miss => "miss",
        }
    }
}

/// Core-side record of the most recent placement.
///
/// This can be mapped to the adapter protocol `last_event`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastPlacement {
    pub placement: Placement,
    pub delta: f32,
    pub overlap: f32,
    pub points: u32,
    pub tower_height: u32,
}

/// Sound cues requested from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Place,
    Perfect,
    GameOver,
}

impl SoundCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundCue::Place => "place",
            SoundCue::Perfect => "perfect",
            SoundCue::GameOver => "gameover",
        }
    }
}
