//! Chess value types and the rules-engine seam.
//!
//! Everything here is position bookkeeping; what a player is allowed to
//! see lives in [`crate::fog`].

pub use self::board::Board;
pub use self::error::ChessError;
pub use self::piece::{Color, Piece, PieceType};
pub use self::rules::{RulesEngine, StandardRules};
pub use self::square::Square;

mod board;
mod error;
mod piece;
pub mod rules;
mod square;
