use tui_stacker::core::{apply_all, GameSession, Headless, Presentation};
use tui_stacker::engine::FallingWorld;
use tui_stacker::term::{layer_color, AdapterStatusView, FrameBuffer, GameView, Scene, Viewport};
use tui_stacker::types::{GameAction, TICK_MS};

fn screen_text(fb: &FrameBuffer) -> String {
    let mut all = String::new();
    for y in 0..fb.height() {
        for x in 0..fb.width() {
            all.push(fb.get(x, y).unwrap().ch);
        }
        all.push('\n');
    }
    all
}

fn running() -> (GameSession, FallingWorld, Scene) {
    let mut session = GameSession::new(7);
    let mut world = FallingWorld::new();
    let mut scene = Scene::new();
    let effects = session.apply_action(GameAction::Trigger, &mut world);
    apply_all(effects, &mut scene);
    (session, world, scene)
}

#[test]
fn term_view_shows_idle_prompt() {
    let session = GameSession::new(0);
    let scene = Scene::new();
    let fb = GameView::default().render(&scene, &session.snapshot(), Viewport::new(80, 24));
    assert!(screen_text(&fb).contains("PRESS SPACE"));
}

#[test]
fn term_view_draws_both_elevations_and_hud() {
    let (session, _world, scene) = running();
    let fb = GameView::default().render(&scene, &session.snapshot(), Viewport::new(80, 24));
    let text = screen_text(&fb);

    assert!(text.contains("FRONT"));
    assert!(text.contains("SIDE"));
    assert!(text.contains("SCORE"));
    assert!(text.contains("BEST"));
    assert!(text.contains("HEIGHT"));
    assert!(!text.contains("PRESS SPACE"));
    assert_eq!(fb.get(0, 0).unwrap().ch, '┌');
}

#[test]
fn term_view_colours_base_layer_orange() {
    let (session, _world, scene) = running();
    let fb = GameView::default().render(&scene, &session.snapshot(), Viewport::new(80, 24));

    let base = layer_color(0);
    let found = fb
        .cells()
        .iter()
        .any(|c| c.ch == '█' && c.style.fg == base);
    assert!(found);
}

#[test]
fn term_view_shows_game_over_overlay() {
    let (mut session, mut world, mut scene) = running();
    let effects = session.apply_action(GameAction::Trigger, &mut world);
    apply_all(effects, &mut scene);
    // Mover is still off the tower at spawn: that trigger is a miss.
    for _ in 0..100 {
        let effects = session.tick(TICK_MS, &mut world);
        apply_all(effects, &mut scene);
    }

    let fb = GameView::default().render(&scene, &session.snapshot(), Viewport::new(80, 24));
    let text = screen_text(&fb);
    assert!(text.contains("GAME OVER"));
    assert!(text.contains("ENTER TO RESTART"));
}

#[test]
fn term_view_reports_adapter_status() {
    let (session, _world, scene) = running();
    let status = AdapterStatusView {
        enabled: true,
        client_count: 2,
        controller_id: Some(1),
        streaming_count: 1,
    };
    let fb = GameView::default().render_with_adapter(
        &scene,
        &session.snapshot(),
        Some(&status),
        Viewport::new(80, 30),
    );
    let text = screen_text(&fb);
    assert!(text.contains("clients"));
    assert!(text.contains("CTRL 1"));
}

#[test]
fn term_view_survives_tiny_viewports() {
    let (session, _world, scene) = running();
    let view = GameView::default();
    for (w, h) in [(0, 0), (1, 1), (5, 3), (20, 2)] {
        let fb = view.render(&scene, &session.snapshot(), Viewport::new(w, h));
        assert_eq!(fb.width(), w);
        assert_eq!(fb.height(), h);
    }
}

#[test]
fn headless_presentation_accepts_every_effect() {
    let mut session = GameSession::new(0);
    let mut world = FallingWorld::new();
    let mut sink = Headless;
    let effects = session.apply_action(GameAction::Trigger, &mut world);
    apply_all(effects, &mut sink);
    sink.set_score(3);
}
