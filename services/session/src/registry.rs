//! Global session registry
//!
//! `code → session`, shared-read with exclusive writes only on the small
//! create/lookup path. All heavier state lives inside each `Game`, behind
//! that session's mutex. Sessions live for the process lifetime.

use crate::game::Game;
use crate::protocol::MarketDef;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use types::ids::GameCode;

/// Shared session handle. The mutex serializes every command touching the
/// session, which is the entire concurrency story within one game.
pub type SharedGame = Arc<Mutex<Game>>;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    games: DashMap<GameCode, SharedGame>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &GameCode) -> Option<SharedGame> {
        self.games.get(code).map(|g| g.value().clone())
    }

    /// Create the session for `code` if absent, else return the existing
    /// one untouched. Creation is idempotent per code; a second create's
    /// market definitions are ignored.
    pub fn get_or_create(&self, code: GameCode, defs: &[MarketDef]) -> SharedGame {
        self.games
            .entry(code.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Game::new(code, defs))))
            .value()
            .clone()
    }

    pub fn session_count(&self) -> usize {
        self.games.len()
    }
}
