//! Game lifecycle: pairing players, running a fog-of-war game, and keeping
//! track of the games that are still alive.

pub mod error;
pub mod matchmaker;
pub mod registry;
pub mod session;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::{GameError, GameResult};
pub use matchmaker::{EnqueueOutcome, GameStart, Matchmaker, RulesFactory};
pub use registry::SessionRegistry;
pub use session::{
    EndReason, GameOver, GameSession, MoveOutcome, MoveSummary, PlayerView, Players, Status,
};

/// Identity of one connected player. Assigned by the transport, unique for
/// the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Session identifier as seen by clients
pub type GameId = String;

/// Generate a unique game ID using UUID v4
///
/// ```
/// use fogmate::game::generate_game_id;
///
/// let game_id = generate_game_id();
/// assert!(game_id.starts_with("g_"));
/// ```
pub fn generate_game_id() -> GameId {
    format!("g_{}", uuid::Uuid::new_v4())
}
