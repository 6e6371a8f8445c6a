//! Runner - session, physics backend and high score store wired together
//!
//! The session only describes side effects. The runner carries them out:
//! presentation effects go to the caller's [`Presentation`], new best
//! scores go to the store. A store failure is logged and play continues.

use tracing::warn;

use tui_stacker_core::{
    Effect, GameSession, GameSnapshot, PlaceError, Physics, Presentation, SessionConfig,
};
use tui_stacker_types::{GameAction, Placement};

use crate::store::HighScoreStore;

#[derive(Debug)]
pub struct Runner<P, S> {
    session: GameSession,
    physics: P,
    store: S,
}

impl<P: Physics, S: HighScoreStore> Runner<P, S> {
    pub fn new(physics: P, store: S) -> Self {
        Self::with_config(SessionConfig::default(), physics, store)
    }

    /// Load the stored best score and build an idle session around it.
    pub fn with_config(config: SessionConfig, physics: P, mut store: S) -> Self {
        let high_score = match store.load() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "could not load high score; starting from 0");
                0
            }
        };
        Self {
            session: GameSession::with_config(config, high_score),
            physics,
            store,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.session.snapshot()
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        self.session.snapshot_into(out);
    }

    /// Returns `true` if the action produced any effect.
    pub fn apply_action<V: Presentation + ?Sized>(
        &mut self,
        action: GameAction,
        presentation: &mut V,
    ) -> bool {
        let effects = self.session.apply_action(action, &mut self.physics);
        dispatch(effects, &mut self.store, presentation)
    }

    pub fn place_at<V: Presentation + ?Sized>(
        &mut self,
        offset: f32,
        presentation: &mut V,
    ) -> Result<Placement, PlaceError> {
        let result = self.session.place_at(offset, &mut self.physics);
        dispatch(self.session.effects(), &mut self.store, presentation);
        result
    }

    /// Returns `true` if anything changed.
    pub fn tick<V: Presentation + ?Sized>(&mut self, elapsed_ms: u32, presentation: &mut V) -> bool {
        let effects = self.session.tick(elapsed_ms, &mut self.physics);
        dispatch(effects, &mut self.store, presentation)
    }
}

fn dispatch<S: HighScoreStore, V: Presentation + ?Sized>(
    effects: &[Effect],
    store: &mut S,
    presentation: &mut V,
) -> bool {
    for effect in effects {
        match *effect {
            Effect::PersistHighScore(score) => {
                if let Err(e) = store.save(score) {
                    warn!(error = %e, score, "could not persist high score");
                }
            }
            _ => effect.apply(presentation),
        }
    }
    !effects.is_empty()
}
