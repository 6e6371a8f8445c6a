//! Terminal stacker (default binary).
//!
//! Runs the game loop: crossterm input, a fixed 16 ms simulation tick, the
//! framebuffer renderer and, unless disabled, the TCP adapter for remote
//! controllers.
//!
//! Logs go to the file named by `STACKER_LOG_PATH` (filter `STACKER_LOG`,
//! default `info`); without it nothing is logged, since the terminal belongs
//! to the game.

use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use tui_stacker::adapter::{
    create_ack, create_error, observation_from_snapshot, Adapter, ClientCommand, ErrorCode,
    InboundCommand, InboundPayload, OutboundMessage,
};
use tui_stacker::core::{GameSnapshot, Presentation};
use tui_stacker::engine::{FallingWorld, HighScoreStore, JsonFileStore, MemoryStore, Runner};
use tui_stacker::input::{handle_key_event, handle_mouse_event, should_quit};
use tui_stacker::term::{AdapterStatusView, FrameBuffer, GameView, Scene, TerminalRenderer, Viewport};
use tui_stacker::types::TICK_MS;

type GameRunner = Runner<FallingWorld, Box<dyn HighScoreStore>>;

fn main() -> Result<()> {
    init_logging();

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term);

    // Always try to restore terminal state.
    let _ = term.exit();
    if let Err(e) = &result {
        warn!(error = %e, "game loop failed");
    }
    info!("exit");
    result
}

fn init_logging() {
    let Ok(path) = std::env::var("STACKER_LOG_PATH") else {
        return;
    };
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("cannot open log file {}: {}", path, e);
            return;
        }
    };
    let filter = EnvFilter::try_from_env("STACKER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn open_store() -> Box<dyn HighScoreStore> {
    match JsonFileStore::from_env() {
        Ok(store) => {
            info!(path = %store.path().display(), "high score file");
            Box::new(store)
        }
        Err(e) => {
            warn!(error = %e, "no high score file; best score will not persist");
            Box::new(MemoryStore::default())
        }
    }
}

fn bell_enabled() -> bool {
    std::env::var("STACKER_BELL")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn run(term: &mut TerminalRenderer) -> Result<()> {
    let mut runner: GameRunner = Runner::new(FallingWorld::new(), open_store());
    let mut scene = Scene::new().with_bell(bell_enabled());
    scene.set_high_score(runner.session().high_score());

    let mut adapter = Adapter::start_from_env();
    if let Some(addr) = adapter.as_ref().and_then(|a| a.local_addr()) {
        info!(%addr, "remote control enabled");
    }

    let view = GameView::default();
    let mut fb = FrameBuffer::new(0, 0);
    let mut snap = GameSnapshot::default();
    let mut obs_seq: u64 = 0;

    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    loop {
        // Render.
        runner.snapshot_into(&mut snap);
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        let status = adapter.as_ref().map(|a| {
            let st = a.status();
            AdapterStatusView {
                enabled: true,
                client_count: st.client_count,
                controller_id: st.controller_id,
                streaming_count: st.streaming_count,
            }
        });
        view.render_into_with_adapter(&scene, &snap, status.as_ref(), Viewport::new(w, h), &mut fb);
        term.draw_swap(&mut fb)?;
        if scene.take_bell() {
            term.bell()?;
        }

        // Input with timeout until next tick.
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if should_quit(key) {
                        return Ok(());
                    }
                    if let Some(action) = handle_key_event(key) {
                        debug!(action = action.as_str(), "key");
                        runner.apply_action(action, &mut scene);
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = handle_mouse_event(mouse, runner.session().phase()) {
                        debug!(action = action.as_str(), "pointer");
                        runner.apply_action(action, &mut scene);
                    }
                }
                Event::Resize(_, _) => term.invalidate(),
                _ => {}
            }
        }

        // Tick.
        if last_tick.elapsed() >= tick_duration {
            last_tick = Instant::now();

            if let Some(adapter) = adapter.as_mut() {
                while let Some(cmd) = adapter.try_recv() {
                    apply_remote(&mut runner, &mut scene, adapter, cmd);
                }
            }

            runner.tick(TICK_MS, &mut scene);

            if let Some(adapter) = adapter.as_ref() {
                runner.snapshot_into(&mut snap);
                obs_seq += 1;
                adapter.send(OutboundMessage::BroadcastObservation {
                    obs: observation_from_snapshot(&snap, obs_seq),
                });
            }
        }
    }
}

/// Apply one remote command and answer it.
fn apply_remote(runner: &mut GameRunner, scene: &mut Scene, adapter: &Adapter, cmd: InboundCommand) {
    let InboundCommand {
        client_id,
        seq,
        payload,
    } = cmd;

    let reply = match payload {
        InboundPayload::SnapshotRequest => OutboundMessage::ToClientObservation {
            client_id,
            obs: observation_from_snapshot(&runner.snapshot(), seq),
        },
        InboundPayload::Command(ClientCommand::Actions(actions)) => {
            for action in actions {
                runner.apply_action(action, scene);
            }
            OutboundMessage::ToClientAck {
                client_id,
                ack: create_ack(seq),
            }
        }
        InboundPayload::Command(ClientCommand::Place { offset }) => {
            match runner.place_at(offset, scene) {
                Ok(placement) => {
                    debug!(client_id, offset, placement = placement.as_str(), "remote place");
                    OutboundMessage::ToClientAck {
                        client_id,
                        ack: create_ack(seq),
                    }
                }
                Err(e) => OutboundMessage::ToClientError {
                    client_id,
                    err: create_error(seq, ErrorCode::from(e), e.message()),
                },
            }
        }
    };
    adapter.send(reply);
}
