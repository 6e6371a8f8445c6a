//! Integration tests for whole runs against the real physics backend

use tui_stacker::core::{Effect, GameSession, PlaceError, SessionConfig};
use tui_stacker::engine::FallingWorld;
use tui_stacker::types::{
    Axis, GameAction, Phase, Placement, BASE_LAYERS, BASE_SIZE, SPAWN_COORDINATE, TICK_MS,
};

fn started() -> (GameSession, FallingWorld) {
    let mut session = GameSession::new(0);
    let mut world = FallingWorld::new();
    session.apply_action(GameAction::Trigger, &mut world);
    (session, world)
}

/// Tick until `phase` or give up after `max` ticks. Returns ticks used.
fn tick_until(session: &mut GameSession, world: &mut FallingWorld, phase: Phase, max: u32) -> u32 {
    for i in 0..max {
        if session.phase() == phase {
            return i;
        }
        session.tick(TICK_MS, world);
    }
    assert_eq!(session.phase(), phase, "phase not reached in {} ticks", max);
    max
}

#[test]
fn test_trigger_from_idle_builds_base_and_mover() {
    let (session, _world) = started();

    assert_eq!(session.phase(), Phase::Running);
    assert_eq!(session.tower().len(), BASE_LAYERS);
    assert_eq!(session.score(), 0);

    let mover = session.mover().unwrap();
    assert_eq!(mover.axis, Axis::X);
    assert_eq!(mover.block.position.x, SPAWN_COORDINATE);
    assert_eq!(mover.block.position.y, BASE_LAYERS as f32);
    assert_eq!(mover.block.size_x, BASE_SIZE);
}

#[test]
fn test_axes_alternate_and_sizes_shrink() {
    let (mut session, mut world) = started();

    assert_eq!(session.place_at(0.5, &mut world), Ok(Placement::Partial));
    let top = session.tower().top().unwrap().block;
    assert!((top.size_x - (BASE_SIZE - 0.5)).abs() < 1e-4);
    assert_eq!(top.size_z, BASE_SIZE);
    assert_eq!(session.mover().unwrap().axis, Axis::Z);
    assert_eq!(session.tower().fragments().len(), 1);

    assert_eq!(session.place_at(-0.5, &mut world), Ok(Placement::Partial));
    let top = session.tower().top().unwrap().block;
    assert!((top.size_z - (BASE_SIZE - 0.5)).abs() < 1e-4);
    assert_eq!(session.mover().unwrap().axis, Axis::X);

    // Next mover inherits the shrunk footprint.
    let mover = session.mover().unwrap().block;
    assert_eq!(mover.size_x, top.size_x);
    assert_eq!(mover.size_z, top.size_z);
    assert_eq!(session.score(), 2);
}

#[test]
fn test_perfect_drops_keep_full_size() {
    let (mut session, mut world) = started();

    for _ in 0..5 {
        assert_eq!(session.place_at(0.05, &mut world), Ok(Placement::Perfect));
    }
    let top = session.tower().top().unwrap().block;
    assert_eq!(top.size_x, BASE_SIZE);
    assert_eq!(top.size_z, BASE_SIZE);
    assert_eq!(top.position.x, 0.0);
    assert!(session.tower().fragments().is_empty());
    assert_eq!(session.score(), 25);
}

#[test]
fn test_miss_fails_then_game_over_after_delay() {
    let (mut session, mut world) = started();
    session.place_at(1.0, &mut world).unwrap();

    assert_eq!(session.place_at(BASE_SIZE * 2.0, &mut world), Ok(Placement::Miss));
    assert_eq!(session.phase(), Phase::Failing);
    assert!(session.mover().is_none());
    assert_eq!(session.high_score(), 1);
    assert!(session
        .effects()
        .iter()
        .any(|e| matches!(e, Effect::PersistHighScore(1))));

    // Triggers are ignored while failing.
    session.apply_action(GameAction::Trigger, &mut world);
    assert_eq!(session.phase(), Phase::Failing);

    let ticks = tick_until(&mut session, &mut world, Phase::GameOver, 200);
    let delay_ticks = SessionConfig::default().game_over_delay_ms / TICK_MS;
    assert!(ticks >= delay_ticks, "game over after {} ticks", ticks);

    // Terminal until reset.
    session.apply_action(GameAction::Trigger, &mut world);
    assert_eq!(session.phase(), Phase::GameOver);
    assert_eq!(session.place_at(0.0, &mut world), Err(PlaceError::NotPlayable));
}

#[test]
fn test_runaway_mover_fails_without_input() {
    let (mut session, mut world) = started();
    tick_until(&mut session, &mut world, Phase::Failing, 400);
    assert_eq!(session.tower().len(), BASE_LAYERS);
    assert_eq!(session.tower().fragments().len(), 1);
}

#[test]
fn test_reset_during_failing_discards_stale_game_over() {
    let (mut session, mut world) = started();
    session.place_at(10.0, &mut world).unwrap();
    assert_eq!(session.phase(), Phase::Failing);
    let failed_generation = session.generation();

    session.apply_action(GameAction::Reset, &mut world);
    assert_eq!(session.phase(), Phase::Running);
    assert!(session.generation() > failed_generation);

    // Well past the old deadline the new run is still going.
    for _ in 0..80 {
        session.tick(TICK_MS, &mut world);
    }
    assert_eq!(session.phase(), Phase::Running);
}

#[test]
fn test_reset_clears_tower_and_physics() {
    let (mut session, mut world) = started();
    session.place_at(1.0, &mut world).unwrap();
    session.place_at(1.0, &mut world).unwrap();
    assert_eq!(world.len(), 2);

    session.apply_action(GameAction::Reset, &mut world);
    assert_eq!(world.len(), 0);
    assert_eq!(session.tower().len(), BASE_LAYERS);
    assert!(session.tower().fragments().is_empty());
    assert_eq!(session.score(), 0);
    assert!(session.last_placement().is_none());
}

#[test]
fn test_fragments_fall_under_gravity() {
    let (mut session, mut world) = started();
    session.place_at(1.0, &mut world).unwrap();
    let before = session.tower().fragments()[0].block.position.y;

    for _ in 0..10 {
        session.tick(TICK_MS, &mut world);
    }
    let after = session.tower().fragments()[0].block.position.y;
    assert!(after < before);
}

#[test]
fn test_snapshot_tracks_session() {
    let (mut session, mut world) = started();
    session.place_at(0.0, &mut world).unwrap();
    session.tick(TICK_MS, &mut world);

    let snap = session.snapshot();
    assert_eq!(snap.phase, Phase::Running);
    assert!(snap.playable());
    assert_eq!(snap.score, 5);
    assert_eq!(snap.tower_height, BASE_LAYERS as u32 + 1);
    assert_eq!(snap.clock_ms, TICK_MS as u64);
    assert_eq!(snap.last_placement.map(|p| p.placement), Some(Placement::Perfect));
    assert_eq!(snap.mover.map(|m| m.axis), Some(Some(Axis::Z)));
}

/// Drop one block per entry: `true` lands centred (perfect), `false` lands
/// 0.5 off (trimmed). Checks the tower grows by one each time.
fn play_sequence(perfects: &[bool]) -> (u32, usize) {
    let (mut session, mut world) = started();
    for (i, &perfect) in perfects.iter().enumerate() {
        let offset = if perfect { 0.0 } else { 0.5 };
        let expected = if perfect {
            Placement::Perfect
        } else {
            Placement::Partial
        };
        assert_eq!(session.place_at(offset, &mut world), Ok(expected));
        assert_eq!(session.tower().len(), BASE_LAYERS + i + 1);
        session.tick(TICK_MS, &mut world);
    }
    (session.score(), session.tower().len())
}

#[test]
fn test_mixed_score_is_order_independent() {
    let orders: [&[bool]; 3] = [
        &[true, false, true, false, false],
        &[false, false, false, true, true],
        &[true, true, false, false, false],
    ];
    for order in orders {
        let p = order.iter().filter(|&&b| b).count() as u32;
        let s = order.len() as u32 - p;
        let (score, height) = play_sequence(order);
        assert_eq!(score, 5 * p + s, "order {:?}", order);
        assert_eq!(height, BASE_LAYERS + order.len());
    }
}

#[test]
fn test_huge_tick_returns_and_fails_the_run() {
    let (mut session, mut world) = started();
    session.place_at(1.0, &mut world).unwrap();

    session.tick(u32::MAX, &mut world);
    assert_eq!(session.phase(), Phase::Failing);
    session.tick(u32::MAX, &mut world);
    assert_eq!(session.phase(), Phase::GameOver);
    assert!(session.tower().fragments().len() <= 2);
}
