//! Game session module - the state machine for one player
//!
//! [`GameSession`] owns the tower, the active mover, the score and the
//! pending game-over timer. It is driven by two entry points:
//!
//! - [`GameSession::apply_action`] for discrete input (trigger / reset)
//! - [`GameSession::tick`] once per frame with the elapsed time
//!
//! Both take the physics backend by reference and return the effects the
//! host should forward to its presentation layer.
//!
//! # Per-tick order
//!
//! 1. advance the mover along its axis
//! 2. fail the run if the mover has run too far past the tower
//! 3. step physics and read fragment poses back
//! 4. cull fragments that fell far below the tower top
//! 5. run deferred actions that are due
//!
//! # Deferred game over
//!
//! A fail moves the session to [`Phase::Failing`] and schedules the switch to
//! [`Phase::GameOver`] [`SessionConfig::game_over_delay_ms`] later. The entry
//! records the run generation it was scheduled in; a reset bumps the
//! generation, so an entry left over from an abandoned run fires as a no-op.

use tracing::{debug, info, warn};

use crate::effects::Effect;
use crate::geometry::{self, Overlap, Resolution};
use crate::physics::{fragment_mass, Physics};
use crate::scoring::{beats_high_score, mover_speed, placement_score, step_advance};
use crate::snapshot::GameSnapshot;
use crate::tower::Tower;
use crate::types::*;

/// Gameplay tuning. Defaults match the constants in the types crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub base_size: f32,
    pub spawn_coordinate: f32,
    pub base_speed: f32,
    pub speed_ramp: f32,
    pub runaway_limit: f32,
    pub game_over_delay_ms: u32,
    pub fragment_cull_depth: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_size: BASE_SIZE,
            spawn_coordinate: SPAWN_COORDINATE,
            base_speed: BASE_SPEED,
            speed_ramp: SPEED_RAMP_PER_LAYER,
            runaway_limit: RUNAWAY_LIMIT,
            game_over_delay_ms: GAME_OVER_DELAY_MS,
            fragment_cull_depth: FRAGMENT_CULL_DEPTH,
        }
    }
}

impl SessionConfig {
    /// Replace every out-of-range field with its default.
    ///
    /// Sizes, limits and the cull depth must be finite and positive; the
    /// spawn coordinate and speeds must be finite.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let positive = |v: f32, dv: f32| if v.is_finite() && v > 0.0 { v } else { dv };
        let finite = |v: f32, dv: f32| if v.is_finite() { v } else { dv };
        Self {
            base_size: positive(self.base_size, d.base_size),
            spawn_coordinate: finite(self.spawn_coordinate, d.spawn_coordinate),
            base_speed: finite(self.base_speed, d.base_speed),
            speed_ramp: finite(self.speed_ramp, d.speed_ramp),
            runaway_limit: positive(self.runaway_limit, d.runaway_limit),
            game_over_delay_ms: self.game_over_delay_ms,
            fragment_cull_depth: positive(self.fragment_cull_depth, d.fragment_cull_depth),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    NotPlayable,
    NoMover,
    /// The requested offset is NaN or infinite.
    InvalidOffset,
}

impl PlaceError {
    pub fn code(self) -> &'static str {
        match self {
            PlaceError::NotPlayable => "not_playable",
            PlaceError::NoMover | PlaceError::InvalidOffset => "invalid_place",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            PlaceError::NotPlayable => "game is not playable",
            PlaceError::NoMover => "no active mover",
            PlaceError::InvalidOffset => "offset must be a finite number",
        }
    }
}

/// The block currently sliding over the tower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mover {
    pub id: BlockId,
    pub block: Block,
    pub axis: Axis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeferredAction {
    EnterGameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Deferred {
    generation: u64,
    due_ms: u64,
    action: DeferredAction,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    config: SessionConfig,
    phase: Phase,
    tower: Tower,
    mover: Option<Mover>,
    score: u32,
    high_score: u32,
    /// Run counter; bumped by every reset.
    generation: u64,
    /// Next block id; never rewinds, not even on reset.
    next_id: u64,
    /// Advances only in live phases.
    clock_ms: u64,
    deferred: Vec<Deferred>,
    last_placement: Option<LastPlacement>,
    /// Effects of the most recent call.
    effects: Vec<Effect>,
}

impl GameSession {
    /// Create an idle session seeded with a previously stored best score.
    pub fn new(high_score: u32) -> Self {
        Self::with_config(SessionConfig::default(), high_score)
    }

    pub fn with_config(config: SessionConfig, high_score: u32) -> Self {
        let sanitized = config.sanitized();
        if sanitized != config {
            warn!(?config, "session config out of range; using defaults for invalid fields");
        }
        Self {
            config: sanitized,
            phase: Phase::Idle,
            tower: Tower::with_capacity(64),
            mover: None,
            score: 0,
            high_score,
            generation: 0,
            next_id: 1,
            clock_ms: 0,
            deferred: Vec::with_capacity(4),
            last_placement: None,
            effects: Vec::with_capacity(64),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn tower(&self) -> &Tower {
        &self.tower
    }

    pub fn mover(&self) -> Option<Mover> {
        self.mover
    }

    pub fn last_placement(&self) -> Option<LastPlacement> {
        self.last_placement
    }

    /// Effects produced by the most recent call.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        out.phase = self.phase;
        out.generation = self.generation;
        out.score = self.score;
        out.high_score = self.high_score;
        out.tower_height = self.tower.len() as u32;
        out.top = self.tower.top().map(|l| l.block);
        out.mover = self.mover.map(|m| m.block);
        out.fragments = self.tower.fragments().len() as u32;
        out.last_placement = self.last_placement;
        out.clock_ms = self.clock_ms;
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut out = GameSnapshot::default();
        self.snapshot_into(&mut out);
        out
    }

    /// Apply a discrete input.
    ///
    /// Trigger starts a run from idle and places the mover while running; it
    /// is ignored while a fail is pending and after game over. Reset is
    /// accepted in every phase.
    pub fn apply_action<P: Physics + ?Sized>(
        &mut self,
        action: GameAction,
        physics: &mut P,
    ) -> &[Effect] {
        self.effects.clear();
        match action {
            GameAction::Trigger => match self.phase {
                Phase::Idle => self.restart(physics),
                Phase::Running => self.place(physics),
                Phase::Placing | Phase::Failing | Phase::GameOver => {
                    debug!(phase = self.phase.as_str(), "trigger ignored");
                }
            },
            GameAction::Reset => self.restart(physics),
        }
        &self.effects
    }

    pub fn trigger<P: Physics + ?Sized>(&mut self, physics: &mut P) -> &[Effect] {
        self.apply_action(GameAction::Trigger, physics)
    }

    pub fn reset<P: Physics + ?Sized>(&mut self, physics: &mut P) -> &[Effect] {
        self.apply_action(GameAction::Reset, physics)
    }

    /// Move the mover to `offset` from the block below along its axis, then
    /// place it.
    ///
    /// Used by remote controllers that pick a landing spot instead of timing
    /// a trigger. The resulting effects are available from [`Self::effects`].
    pub fn place_at<P: Physics + ?Sized>(
        &mut self,
        offset: f32,
        physics: &mut P,
    ) -> Result<Placement, PlaceError> {
        self.effects.clear();
        if self.phase != Phase::Running {
            return Err(PlaceError::NotPlayable);
        }
        let Some(anchor) = self.tower.top().map(|l| l.block) else {
            return Err(PlaceError::NoMover);
        };
        let Some(mover) = self.mover.as_mut() else {
            return Err(PlaceError::NoMover);
        };
        if !offset.is_finite() {
            return Err(PlaceError::InvalidOffset);
        }

        let target = anchor.position_along(mover.axis) + offset;
        mover.block = mover.block.with_position_along(mover.axis, target);
        let (id, block) = (mover.id, mover.block);
        self.effects.push(Effect::RenderBlock { id, block });

        self.place(physics);
        Ok(self
            .last_placement
            .map(|p| p.placement)
            .unwrap_or(Placement::Miss))
    }

    /// Advance the session by `elapsed_ms`.
    ///
    /// Nothing moves in [`Phase::Idle`] or [`Phase::GameOver`]; fragments
    /// only fall while a run is live.
    pub fn tick<P: Physics + ?Sized>(&mut self, elapsed_ms: u32, physics: &mut P) -> &[Effect] {
        self.effects.clear();
        if !self.phase.is_live() {
            return &self.effects;
        }

        self.clock_ms = self.clock_ms.saturating_add(elapsed_ms as u64);

        if self.phase == Phase::Running {
            self.advance_mover(elapsed_ms);
            self.check_runaway(physics);
        }
        self.step_physics(elapsed_ms, physics);
        self.run_deferred();

        &self.effects
    }

    fn alloc_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        debug!(from = self.phase.as_str(), to = phase.as_str(), "phase change");
        self.phase = phase;
        self.effects.push(Effect::PhaseChanged(phase));
    }

    /// Tear down the current run and start a fresh one.
    fn restart<P: Physics + ?Sized>(&mut self, physics: &mut P) {
        self.generation = self.generation.wrapping_add(1);

        let effects = &mut self.effects;
        if let Some(m) = self.mover.take() {
            effects.push(Effect::RemoveBlock { id: m.id });
        }
        self.tower.clear(|id, body| {
            if let Some(body) = body {
                physics.remove_fragment(body);
            }
            effects.push(Effect::RemoveBlock { id });
        });

        self.score = 0;
        self.last_placement = None;
        self.effects.push(Effect::SetScore(0));
        self.effects.push(Effect::SetHighScore(self.high_score));

        let size = self.config.base_size;
        for layer in 0..BASE_LAYERS {
            let block = Block::new(
                Vec3::new(0.0, layer as f32 * BLOCK_HEIGHT, 0.0),
                size,
                size,
                None,
            );
            let id = self.alloc_id();
            if !self.tower.push(id, block) {
                warn!(size, "base layer rejected; staying idle");
                self.set_phase(Phase::Idle);
                return;
            }
            self.effects.push(Effect::RenderBlock { id, block });
        }

        self.spawn_mover(Axis::X);
        self.set_phase(Phase::Running);
        info!(generation = self.generation, "run started");
    }

    /// Put a new mover one layer above the top, off the tower along `axis`.
    fn spawn_mover(&mut self, axis: Axis) {
        let Some(top) = self.tower.top().map(|l| l.block) else {
            return;
        };
        let block = Block::new(
            top.position + Vec3::new(0.0, BLOCK_HEIGHT, 0.0),
            top.size_x,
            top.size_z,
            Some(axis),
        )
        .with_position_along(axis, self.config.spawn_coordinate);

        let id = self.alloc_id();
        self.mover = Some(Mover { id, block, axis });
        self.effects.push(Effect::RenderBlock { id, block });
    }

    /// Hand a block to physics and track it as a fragment.
    fn spawn_fragment<P: Physics + ?Sized>(&mut self, physics: &mut P, block: Block) {
        let block = block.into_dynamic();
        let body = physics.add_fragment(&block, fragment_mass(&block));
        let id = self.alloc_id();
        self.tower.add_fragment(id, body, block);
        self.effects.push(Effect::RenderBlock { id, block });
    }

    fn place<P: Physics + ?Sized>(&mut self, physics: &mut P) {
        let Some(mover) = self.mover else {
            return;
        };
        let Some(previous) = self.tower.top().map(|l| l.block) else {
            return;
        };

        // Transient: resolved before this call returns, so no effect.
        self.phase = Phase::Placing;

        let (overlap, resolution) = geometry::resolve(&mover.block, &previous, mover.axis);
        let (placed, fragment) = match resolution {
            Resolution::Perfect { placed } => (placed, None),
            Resolution::Partial(split) => (split.kept, Some(split.fragment)),
            Resolution::Miss => {
                self.fail(physics, mover, overlap);
                return;
            }
        };

        if !self.tower.push(mover.id, placed) {
            self.fail(physics, mover, overlap);
            return;
        }
        self.mover = None;
        self.effects.push(Effect::RenderBlock {
            id: mover.id,
            block: placed,
        });
        if let Some(fragment) = fragment {
            self.spawn_fragment(physics, fragment);
        }

        let placement = resolution.placement();
        let points = placement_score(placement);
        self.score = self.score.saturating_add(points);
        self.effects.push(Effect::SetScore(self.score));
        self.effects.push(Effect::PlaySound(match placement {
            Placement::Perfect => SoundCue::Perfect,
            _ => SoundCue::Place,
        }));
        self.last_placement = Some(LastPlacement {
            placement,
            delta: overlap.delta,
            overlap: overlap.overlap_size,
            points,
            tower_height: self.tower.len() as u32,
        });
        debug!(
            placement = placement.as_str(),
            delta = overlap.delta,
            score = self.score,
            "placed"
        );

        self.spawn_mover(mover.axis.other());
        self.phase = Phase::Running;
    }

    /// The whole mover falls; game over follows after the delay.
    fn fail<P: Physics + ?Sized>(&mut self, physics: &mut P, mover: Mover, overlap: Overlap) {
        self.mover = None;
        self.effects.push(Effect::RemoveBlock { id: mover.id });
        self.spawn_fragment(physics, mover.block);
        self.effects.push(Effect::PlaySound(SoundCue::GameOver));

        if beats_high_score(self.score, self.high_score) {
            self.high_score = self.score;
            self.effects.push(Effect::SetHighScore(self.high_score));
            self.effects.push(Effect::PersistHighScore(self.high_score));
        }

        self.last_placement = Some(LastPlacement {
            placement: Placement::Miss,
            delta: overlap.delta,
            overlap: overlap.overlap_size,
            points: 0,
            tower_height: self.tower.len() as u32,
        });

        self.deferred.push(Deferred {
            generation: self.generation,
            due_ms: self
                .clock_ms
                .saturating_add(self.config.game_over_delay_ms as u64),
            action: DeferredAction::EnterGameOver,
        });
        self.set_phase(Phase::Failing);
        info!(
            generation = self.generation,
            score = self.score,
            height = self.tower.len(),
            "run failed"
        );
    }

    fn advance_mover(&mut self, elapsed_ms: u32) {
        let speed = mover_speed(
            self.tower.len(),
            self.config.base_speed,
            self.config.speed_ramp,
        );
        let Some(mover) = self.mover.as_mut() else {
            return;
        };
        let pos = mover.block.position_along(mover.axis) + step_advance(speed, elapsed_ms);
        mover.block = mover.block.with_position_along(mover.axis, pos);
        let (id, block) = (mover.id, mover.block);
        self.effects.push(Effect::RenderBlock { id, block });
    }

    fn check_runaway<P: Physics + ?Sized>(&mut self, physics: &mut P) {
        let Some(mover) = self.mover else {
            return;
        };
        let Some(previous) = self.tower.top().map(|l| l.block) else {
            return;
        };
        let offset = mover.block.position_along(mover.axis) - previous.position_along(mover.axis);
        if offset > self.config.runaway_limit {
            debug!(offset, "mover ran past the tower");
            let overlap = Overlap::measure(&mover.block, &previous, mover.axis);
            self.fail(physics, mover, overlap);
        }
    }

    fn step_physics<P: Physics + ?Sized>(&mut self, elapsed_ms: u32, physics: &mut P) {
        if self.tower.fragments().is_empty() {
            return;
        }
        physics.step(elapsed_ms as f32 / 1000.0);

        for f in self.tower.fragments_mut() {
            if let Some(position) = physics.position(f.body) {
                f.block.position = position;
            }
            if let Some(orientation) = physics.orientation(f.body) {
                f.orientation = orientation;
            }
            self.effects.push(Effect::PoseFragment {
                id: f.id,
                position: f.block.position,
                orientation: f.orientation,
            });
        }

        let floor = self.tower.top_y() - self.config.fragment_cull_depth;
        let effects = &mut self.effects;
        self.tower.retain_fragments(|f| {
            if f.block.position.y >= floor {
                return true;
            }
            physics.remove_fragment(f.body);
            effects.push(Effect::RemoveBlock { id: f.id });
            false
        });
    }

    fn run_deferred(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let now = self.clock_ms;
        let generation = self.generation;
        let mut enter_game_over = false;
        self.deferred.retain(|d| {
            if d.due_ms > now {
                return true;
            }
            if d.generation == generation {
                match d.action {
                    DeferredAction::EnterGameOver => enter_game_over = true,
                }
            } else {
                debug!(scheduled = d.generation, current = generation, "stale deferred action dropped");
            }
            false
        });

        if enter_game_over && self.phase == Phase::Failing {
            self.set_phase(Phase::GameOver);
        }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::testing::SinkingPhysics;

    fn running() -> (GameSession, SinkingPhysics) {
        let mut physics = SinkingPhysics::new(10.0);
        let mut session = GameSession::new(0);
        session.trigger(&mut physics);
        (session, physics)
    }

    fn count<F: Fn(&Effect) -> bool>(effects: &[Effect], f: F) -> usize {
        effects.iter().filter(|e| f(e)).count()
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = GameSession::new(42);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.score(), 0);
        assert_eq!(session.high_score(), 42);
        assert!(session.tower().is_empty());
        assert!(session.mover().is_none());
    }

    #[test]
    fn test_trigger_from_idle_starts_run() {
        let (session, _) = running();
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.tower().len(), 2);
        assert_eq!(session.generation(), 1);

        let mover = session.mover().expect("mover");
        assert_eq!(mover.axis, Axis::X);
        assert_eq!(mover.block.position, Vec3::new(-10.0, 2.0, 0.0));
        assert_eq!(mover.block.size_x, 3.0);
        assert_eq!(mover.block.size_z, 3.0);
    }

    #[test]
    fn test_start_effects() {
        let mut physics = SinkingPhysics::new(10.0);
        let mut session = GameSession::new(9);
        let effects = session.trigger(&mut physics).to_vec();

        assert_eq!(count(&effects, |e| matches!(e, Effect::RenderBlock { .. })), 3);
        assert!(effects.contains(&Effect::SetScore(0)));
        assert!(effects.contains(&Effect::SetHighScore(9)));
        assert_eq!(effects.last(), Some(&Effect::PhaseChanged(Phase::Running)));
    }

    #[test]
    fn test_partial_placement() {
        let (mut session, mut physics) = running();
        assert_eq!(session.place_at(1.0, &mut physics), Ok(Placement::Partial));

        assert_eq!(session.score(), 1);
        assert_eq!(session.tower().len(), 3);
        let top = session.tower().top().expect("top").block;
        assert_eq!(top.size_x, 2.0);
        assert_eq!(top.position.x, 0.5);
        assert_eq!(session.tower().fragments().len(), 1);
        assert_eq!(physics.live(), 1);

        let frag = session.tower().fragments()[0].block;
        assert_eq!(frag.size_x, 1.0);
        assert!(frag.is_dynamic());

        let effects = session.effects();
        assert!(effects.contains(&Effect::SetScore(1)));
        assert!(effects.contains(&Effect::PlaySound(SoundCue::Place)));

        let next = session.mover().expect("next mover");
        assert_eq!(next.axis, Axis::Z);
        assert_eq!(next.block.position, Vec3::new(0.5, 3.0, -10.0));
        assert_eq!(next.block.size_x, 2.0);
        assert_eq!(session.phase(), Phase::Running);
    }

    #[test]
    fn test_perfect_placement() {
        let (mut session, mut physics) = running();
        assert_eq!(session.place_at(0.1, &mut physics), Ok(Placement::Perfect));

        assert_eq!(session.score(), 5);
        let top = session.tower().top().expect("top").block;
        assert_eq!(top.size_x, 3.0);
        assert_eq!(top.position.x, 0.0);
        assert!(session.tower().fragments().is_empty());
        assert!(session
            .effects()
            .contains(&Effect::PlaySound(SoundCue::Perfect)));

        let last = session.last_placement().expect("last");
        assert_eq!(last.points, 5);
        assert_eq!(last.tower_height, 3);
    }

    #[test]
    fn test_miss_ends_run_after_delay() {
        let (mut session, mut physics) = running();
        session.place_at(1.0, &mut physics).unwrap();
        assert_eq!(session.place_at(3.5, &mut physics), Ok(Placement::Miss));

        assert_eq!(session.phase(), Phase::Failing);
        assert_eq!(session.tower().len(), 3);
        assert!(session.mover().is_none());
        assert_eq!(session.tower().fragments().len(), 2);
        assert_eq!(session.high_score(), 1);
        assert!(session.effects().contains(&Effect::PersistHighScore(1)));
        assert!(session
            .effects()
            .contains(&Effect::PlaySound(SoundCue::GameOver)));

        session.tick(999, &mut physics);
        assert_eq!(session.phase(), Phase::Failing);
        let effects = session.tick(1, &mut physics).to_vec();
        assert_eq!(session.phase(), Phase::GameOver);
        assert!(effects.contains(&Effect::PhaseChanged(Phase::GameOver)));
    }

    #[test]
    fn test_trigger_ignored_while_failing_and_after_game_over() {
        let (mut session, mut physics) = running();
        session.place_at(5.0, &mut physics).unwrap();
        assert_eq!(session.phase(), Phase::Failing);

        assert!(session.trigger(&mut physics).is_empty());
        assert_eq!(session.phase(), Phase::Failing);

        session.tick(1000, &mut physics);
        assert_eq!(session.phase(), Phase::GameOver);
        assert!(session.trigger(&mut physics).is_empty());
        assert_eq!(
            session.place_at(0.0, &mut physics),
            Err(PlaceError::NotPlayable)
        );
    }

    #[test]
    fn test_reset_during_delay_cancels_stale_game_over() {
        let (mut session, mut physics) = running();
        session.place_at(5.0, &mut physics).unwrap();
        session.tick(500, &mut physics);
        assert_eq!(session.phase(), Phase::Failing);

        session.reset(&mut physics);
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.generation(), 2);

        // Past the original due time: the stale entry must not end the new run.
        session.tick(600, &mut physics);
        assert_ne!(session.phase(), Phase::GameOver);
    }

    #[test]
    fn test_second_fail_after_reset_still_ends_game() {
        let (mut session, mut physics) = running();
        session.place_at(5.0, &mut physics).unwrap();
        session.tick(200, &mut physics);
        session.reset(&mut physics);
        session.place_at(5.0, &mut physics).unwrap();

        // Stale entry comes due first and is dropped.
        session.tick(900, &mut physics);
        assert_eq!(session.phase(), Phase::Failing);
        session.tick(100, &mut physics);
        assert_eq!(session.phase(), Phase::GameOver);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (mut session, mut physics) = running();
        session.place_at(1.0, &mut physics).unwrap();
        for _ in 0..3 {
            session.reset(&mut physics);
            assert_eq!(session.tower().len(), 2);
            assert_eq!(session.score(), 0);
            assert_eq!(session.phase(), Phase::Running);
            assert!(session.tower().fragments().is_empty());
        }
        assert_eq!(physics.live(), 0);
    }

    #[test]
    fn test_reset_removes_previous_blocks() {
        let (mut session, mut physics) = running();
        session.place_at(1.0, &mut physics).unwrap();
        let effects = session.reset(&mut physics).to_vec();

        // 3 layers, 1 fragment, 1 mover.
        assert_eq!(count(&effects, |e| matches!(e, Effect::RemoveBlock { .. })), 5);
        assert_eq!(physics.removed.len(), 1);
    }

    #[test]
    fn test_block_ids_never_reused() {
        let (mut session, mut physics) = running();
        let first = session.mover().expect("mover").id;
        session.reset(&mut physics);
        let second = session.mover().expect("mover").id;
        assert!(second > first);
    }

    #[test]
    fn test_mover_advances_with_elapsed_time() {
        let (mut session, mut physics) = running();
        session.tick(TICK_MS, &mut physics);
        let x = session.mover().expect("mover").block.position.x;
        // speed = 0.15 + 2 * 0.001
        assert!((x - (-10.0 + 0.152)).abs() < 1e-5);
    }

    #[test]
    fn test_runaway_mover_fails() {
        let (mut session, mut physics) = running();
        let mut ticks = 0;
        while session.phase() == Phase::Running {
            session.tick(TICK_MS, &mut physics);
            ticks += 1;
            assert!(ticks < 1000, "mover never ran away");
        }
        assert_eq!(session.phase(), Phase::Failing);
        // From -10 to past +10 at ~0.152 per tick.
        assert!(ticks > 130);
        let last = session.last_placement().expect("last");
        assert_eq!(last.placement, Placement::Miss);
        assert!(last.delta > 10.0);
    }

    #[test]
    fn test_fragments_fall_and_are_culled() {
        let mut physics = SinkingPhysics::new(40.0);
        let mut session = GameSession::new(0);
        session.trigger(&mut physics);
        session.place_at(1.0, &mut physics).unwrap();
        let start_y = session.tower().fragments()[0].block.position.y;

        let effects = session.tick(100, &mut physics).to_vec();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::PoseFragment { .. })));
        assert!(session.tower().fragments()[0].block.position.y < start_y);

        // 40 units/s: 1.6s puts the fragment past the cull depth while the
        // mover is still short of the runaway limit.
        for _ in 0..15 {
            session.tick(100, &mut physics);
        }
        assert_eq!(session.phase(), Phase::Running);
        assert!(session.tower().fragments().is_empty());
        assert_eq!(physics.live(), 0);
    }

    #[test]
    fn test_high_score_never_decreases() {
        let mut physics = SinkingPhysics::new(10.0);
        let mut session = GameSession::new(3);
        session.trigger(&mut physics);
        session.place_at(1.0, &mut physics).unwrap();
        session.place_at(5.0, &mut physics).unwrap();
        assert_eq!(session.high_score(), 3);
        assert!(!session
            .effects()
            .iter()
            .any(|e| matches!(e, Effect::PersistHighScore(_))));
    }

    #[test]
    fn test_idle_and_game_over_do_not_tick() {
        let mut physics = SinkingPhysics::new(10.0);
        let mut session = GameSession::new(0);
        assert!(session.tick(16, &mut physics).is_empty());
        assert_eq!(session.clock_ms(), 0);
        assert_eq!(physics.steps, 0);
    }

    #[test]
    fn test_snapshot_mirrors_state() {
        let (mut session, mut physics) = running();
        session.place_at(1.0, &mut physics).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.phase, Phase::Running);
        assert!(snap.playable());
        assert_eq!(snap.score, 1);
        assert_eq!(snap.tower_height, 3);
        assert_eq!(snap.fragments, 1);
        assert_eq!(snap.mover.map(|b| b.axis), Some(Some(Axis::Z)));
        assert_eq!(snap.generation, 1);
    }

    #[test]
    fn test_non_finite_offset_is_rejected_without_placing() {
        let (mut session, mut physics) = running();
        for offset in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = session.place_at(offset, &mut physics).unwrap_err();
            assert_eq!(err, PlaceError::InvalidOffset);
            assert_eq!(err.code(), "invalid_place");
            assert_ne!(err.message(), PlaceError::NoMover.message());
        }
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.tower().len(), 2);
        assert!(session.mover().is_some());
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let config = SessionConfig {
            base_size: 0.0,
            runaway_limit: f32::NAN,
            base_speed: f32::INFINITY,
            fragment_cull_depth: -1.0,
            ..SessionConfig::default()
        };
        let mut physics = SinkingPhysics::new(10.0);
        let mut session = GameSession::with_config(config, 0);
        assert_eq!(*session.config(), SessionConfig::default());

        session.trigger(&mut physics);
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.tower().len(), 2);
        let mover = session.mover().expect("mover");
        assert_eq!(mover.block.size_x, BASE_SIZE);
    }

    #[test]
    fn test_valid_config_is_kept() {
        let config = SessionConfig {
            base_size: 4.0,
            runaway_limit: 6.0,
            ..SessionConfig::default()
        };
        assert_eq!(config.sanitized(), config);
        let session = GameSession::with_config(config, 0);
        assert_eq!(session.config().base_size, 4.0);
    }
}
