//! Logical protocol between players and the server.
//!
//! Messages are JSON objects tagged by a `type` field with camelCase
//! payload keys. Nothing in here carries check status.

use crate::chess::{Board, ChessError, Color, Piece, PieceType, Square};
use crate::game::{EndReason, GameOver, GameStart, MoveOutcome, MoveSummary, PlayerView};
use serde::{Deserialize, Serialize};

/// Requests a player can send
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    FindGame,
    MakeMove {
        #[serde(rename = "gameId")]
        game_id: String,
        from: Square,
        to: Square,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<PieceType>,
    },
    GetMoves {
        #[serde(rename = "gameId")]
        game_id: String,
        square: Square,
    },
    Resign {
        #[serde(rename = "gameId")]
        game_id: String,
    },
}

impl ClientMessage {
    /// Get the message type as a string
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientMessage::FindGame => "find_game",
            ClientMessage::MakeMove { .. } => "make_move",
            ClientMessage::GetMoves { .. } => "get_moves",
            ClientMessage::Resign { .. } => "resign",
        }
    }
}

/// One occupied cell of a board sent to a player
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCell {
    /// Lower-case piece letter
    #[serde(rename = "type")]
    pub kind: char,
    /// 'w' or 'b'
    pub color: char,
}

impl From<Piece> for WireCell {
    fn from(piece: Piece) -> Self {
        Self {
            kind: piece.kind.letter(),
            color: piece.color.letter(),
        }
    }
}

impl TryFrom<WireCell> for Piece {
    type Error = ChessError;

    fn try_from(cell: WireCell) -> Result<Self, Self::Error> {
        let kind = cell.kind.to_string().parse::<PieceType>()?;
        let color = cell.color.to_string().parse::<Color>()?;
        Ok(Piece::new(kind, color))
    }
}

/// Board as eight rows, eighth rank first; `null` marks an empty or hidden
/// square.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct WireBoard(pub [[Option<WireCell>; 8]; 8]);

impl From<&Board> for WireBoard {
    fn from(board: &Board) -> Self {
        let mut rows = [[None; 8]; 8];
        for (row, cells) in board.rows().iter().enumerate() {
            for (file, cell) in cells.iter().enumerate() {
                rows[row][file] = cell.map(WireCell::from);
            }
        }
        WireBoard(rows)
    }
}

impl WireBoard {
    pub fn to_board(&self) -> Result<Board, ChessError> {
        let mut board = Board::empty();
        for (rank, cells) in self.0.iter().enumerate() {
            for (file, cell) in cells.iter().enumerate() {
                if let Some(cell) = cell {
                    let square = Square::new(file as u8, rank as u8)?;
                    board.set(square, Some(Piece::try_from(*cell)?));
                }
            }
        }
        Ok(board)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOverReason {
    Resign,
    Disconnect,
}

/// Messages the server sends to players
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Waiting,
    GameStart {
        #[serde(rename = "gameId")]
        game_id: String,
        color: Color,
        board: WireBoard,
        #[serde(rename = "visibleSquares")]
        visible_squares: Vec<Square>,
        turn: Color,
    },
    MoveMade {
        #[serde(rename = "move")]
        mv: MoveSummary,
        turn: Color,
        #[serde(rename = "isGameOver")]
        is_game_over: bool,
        #[serde(rename = "isCheckmate")]
        is_checkmate: bool,
        winner: Option<Color>,
        board: WireBoard,
        #[serde(rename = "visibleSquares")]
        visible_squares: Vec<Square>,
    },
    ValidMoves {
        moves: Vec<Square>,
    },
    GameOver {
        reason: GameOverReason,
        winner: Color,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn game_start(game_id: &str, color: Color, start: &GameStart) -> Self {
        let PlayerView { board, visible } = start.view_for(color);
        ServerMessage::GameStart {
            game_id: game_id.to_string(),
            color,
            board: WireBoard::from(board),
            visible_squares: visible.to_vec(),
            turn: start.turn,
        }
    }

    /// `move_made` for one player, carrying only that player's view
    pub fn move_made(outcome: &MoveOutcome, color: Color) -> Self {
        let PlayerView { board, visible } = outcome.view_for(color);
        ServerMessage::MoveMade {
            mv: outcome.mv,
            turn: outcome.turn,
            is_game_over: outcome.is_game_over,
            is_checkmate: outcome.is_checkmate,
            winner: outcome.winner,
            board: WireBoard::from(board),
            visible_squares: visible.to_vec(),
        }
    }

    /// `None` for reasons that are not announced through `game_over`
    pub fn game_over(over: &GameOver) -> Option<Self> {
        let reason = match over.reason {
            EndReason::Resignation => GameOverReason::Resign,
            EndReason::Disconnect => GameOverReason::Disconnect,
            EndReason::Checkmate | EndReason::Stalemate | EndReason::Draw => return None,
        };
        Some(ServerMessage::GameOver {
            reason,
            winner: over.winner,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Get the message type as a string
    pub fn message_type(&self) -> &'static str {
        match self {
            ServerMessage::Waiting => "waiting",
            ServerMessage::GameStart { .. } => "game_start",
            ServerMessage::MoveMade { .. } => "move_made",
            ServerMessage::ValidMoves { .. } => "valid_moves",
            ServerMessage::GameOver { .. } => "game_over",
            ServerMessage::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_find_game() {
        let msg: ClientMessage = serde_json::from_value(json!({"type": "find_game"})).unwrap();
        assert_eq!(msg, ClientMessage::FindGame);
        assert_eq!(msg.message_type(), "find_game");
    }

    #[test]
    fn test_parse_make_move_with_and_without_promotion() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "make_move", "gameId": "g_1", "from": "e7", "to": "e8", "promotion": "n"
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::MakeMove {
                game_id: "g_1".to_string(),
                from: "e7".parse().unwrap(),
                to: "e8".parse().unwrap(),
                promotion: Some(PieceType::Knight),
            }
        );

        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "make_move", "gameId": "g_1", "from": "e2", "to": "e4"
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::MakeMove { promotion: None, .. }));
    }

    #[test]
    fn test_bad_square_is_a_parse_error() {
        let result: Result<ClientMessage, _> = serde_json::from_value(json!({
            "type": "get_moves", "gameId": "g_1", "square": "z9"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "offer_draw", "gameId": "g_1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_wire_board_layout() {
        let board = Board::from_placement("4k3/8/8/8/8/8/8/4K3").unwrap();
        let value = serde_json::to_value(WireBoard::from(&board)).unwrap();
        assert_eq!(value[0][4], json!({"type": "k", "color": "b"}));
        assert_eq!(value[7][4], json!({"type": "k", "color": "w"}));
        assert_eq!(value[3][3], json!(null));
        assert_eq!(WireBoard::from(&board).to_board().unwrap(), board);
    }

    #[test]
    fn test_server_message_tags_and_keys() {
        let waiting = serde_json::to_value(ServerMessage::Waiting).unwrap();
        assert_eq!(waiting, json!({"type": "waiting"}));

        let over = ServerMessage::game_over(&GameOver {
            reason: EndReason::Resignation,
            winner: Color::Black,
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(over).unwrap(),
            json!({"type": "game_over", "reason": "resign", "winner": "black"})
        );

        let error = serde_json::to_value(ServerMessage::error("Not your turn")).unwrap();
        assert_eq!(error, json!({"type": "error", "message": "Not your turn"}));
    }

    #[test]
    fn test_natural_endings_are_not_game_over_messages() {
        let over = GameOver {
            reason: EndReason::Checkmate,
            winner: Color::White,
        };
        assert_eq!(ServerMessage::game_over(&over), None);
    }
}
