use crate::chess::ChessError;
use thiserror::Error;

/// Failures a player can cause. All of them are reported to the offending
/// player only and leave every session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Game not found: {0}")]
    SessionNotFound(String),

    #[error("Game is not in progress")]
    SessionInactive,

    #[error("You are not a player in this game")]
    NotAPlayer,

    #[error("Game id already registered: {0}")]
    DuplicateSession(String),
}

impl From<ChessError> for GameError {
    fn from(err: ChessError) -> Self {
        match err {
            ChessError::IllegalMove(mv) => GameError::IllegalMove(mv),
            other => GameError::IllegalMove(other.to_string()),
        }
    }
}

pub type GameResult<T> = std::result::Result<T, GameError>;
