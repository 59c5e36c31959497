pub mod chess;
pub mod cli;
pub mod config;
pub mod fog;
pub mod game;
pub mod messages;
pub mod network;

// Re-export key types for easy testing
pub use chess::{Board, Color, Piece, PieceType, RulesEngine, Square, StandardRules};
pub use config::ServerConfig;
pub use fog::{filter_board, visible_squares, VisibleSet};
pub use game::{GameError, GameSession, Matchmaker, PlayerId, SessionRegistry};
pub use messages::{ClientMessage, ServerMessage};
pub use network::{Client, Connection, Lobby, Server};
