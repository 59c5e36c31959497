use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    InvalidColor(String),
    InvalidPieceType(String),
    InvalidSquare(String),
    InvalidFen(String),
    IllegalMove(String),
}

impl fmt::Display for ChessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChessError::InvalidColor(msg) => write!(f, "Invalid color: {}", msg),
            ChessError::InvalidPieceType(msg) => write!(f, "Invalid piece type: {}", msg),
            ChessError::InvalidSquare(msg) => write!(f, "Invalid square: {}", msg),
            ChessError::InvalidFen(msg) => write!(f, "Invalid FEN: {}", msg),
            ChessError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
        }
    }
}

impl std::error::Error for ChessError {}
