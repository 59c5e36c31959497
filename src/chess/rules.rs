//! The rules-engine seam.
//!
//! Sessions only need a narrow view of chess: the current placement, whose
//! turn it is, an atomic "check and play" for a proposed move, terminal
//! state queries and legal destinations from a square. [`StandardRules`]
//! provides that on top of `shakmaty`.

use super::{Board, ChessError, Color, Piece, PieceType, Square};
use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, EnPassantMode, File, Move, Position, Rank, Role};

/// Halfmove clock value at which the fifty-move rule ends the game
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Contract a game session relies on for chess legality.
///
/// Deliberately has no "is in check" query: check status is never surfaced
/// to players, so sessions have no reason to ask for it.
pub trait RulesEngine: Send {
    /// Placement snapshot of the current position
    fn board(&self) -> Board;

    /// Side to move
    fn turn(&self) -> Color;

    /// Validate and play a move in one step. On error the position is
    /// unchanged. `promotion: None` promotes to a queen.
    fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<(), ChessError>;

    fn is_game_over(&self) -> bool;

    fn is_checkmate(&self) -> bool;

    fn is_stalemate(&self) -> bool;

    /// Side that delivered mate, if the game ended in checkmate
    fn winner(&self) -> Option<Color> {
        if self.is_checkmate() {
            Some(self.turn().opposite())
        } else {
            None
        }
    }

    /// Destinations of every legal move starting on `from`
    fn legal_destinations(&self, from: Square) -> Vec<Square>;
}

/// Standard chess rules backed by `shakmaty`.
///
/// Besides checkmate, stalemate and insufficient material, the game also
/// ends drawn by the fifty-move rule and by threefold repetition.
#[derive(Debug, Clone)]
pub struct StandardRules {
    position: Chess,
    /// Hash of every position reached, starting position included
    history: Vec<Zobrist64>,
}

impl Default for StandardRules {
    fn default() -> Self {
        Self::from_position(Chess::default())
    }
}

impl StandardRules {
    /// Standard starting position
    pub fn new() -> Self {
        Self::default()
    }

    fn from_position(position: Chess) -> Self {
        let history = vec![position_hash(&position)];
        Self { position, history }
    }

    /// Start from an arbitrary FEN position
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fen: Fen = fen
            .trim()
            .parse()
            .map_err(|e| ChessError::InvalidFen(format!("{}", e)))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| ChessError::InvalidFen(format!("{}", e)))?;
        Ok(Self::from_position(position))
    }

    /// Client-facing (from, to) of a legal move. Castling is reported as
    /// the king's two-square step rather than shakmaty's king-takes-rook.
    fn endpoints(&self, mv: &Move) -> Option<(Square, Square)> {
        let from = from_engine_square(mv.from()?);
        let to = match mv.castling_side() {
            Some(side) => side.king_to(self.position.turn()),
            None => mv.to(),
        };
        Some((from, from_engine_square(to)))
    }

    fn is_fifty_move_draw(&self) -> bool {
        self.position.halfmoves() >= FIFTY_MOVE_HALFMOVES
    }

    fn is_threefold_repetition(&self) -> bool {
        let current = position_hash(&self.position);
        self.history.iter().filter(|&&hash| hash == current).count() >= 3
    }
}

fn position_hash(position: &Chess) -> Zobrist64 {
    position.zobrist_hash(EnPassantMode::Legal)
}

impl RulesEngine for StandardRules {
    fn board(&self) -> Board {
        let engine_board = self.position.board();
        let mut board = Board::empty();
        for square in Square::all() {
            if let Some(piece) = engine_board.piece_at(to_engine_square(square)) {
                board.set(
                    square,
                    Some(Piece::new(from_engine_role(piece.role), from_engine_color(piece.color))),
                );
            }
        }
        board
    }

    fn turn(&self) -> Color {
        from_engine_color(self.position.turn())
    }

    fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<(), ChessError> {
        if let Some(kind) = promotion {
            if !kind.is_promotion_target() {
                return Err(ChessError::IllegalMove(format!(
                    "cannot promote to {}",
                    kind
                )));
            }
        }

        let candidates: Vec<Move> = self
            .position
            .legal_moves()
            .into_iter()
            .filter(|mv| self.endpoints(mv) == Some((from, to)))
            .collect();

        let chosen = if candidates.iter().any(|mv| mv.promotion().is_some()) {
            let wanted = to_engine_role(promotion.unwrap_or(PieceType::Queen));
            candidates
                .into_iter()
                .find(|mv| mv.promotion() == Some(wanted))
        } else if promotion.is_some() {
            // A promotion piece was named for a move that does not promote
            None
        } else {
            candidates.into_iter().next()
        };

        match chosen {
            Some(mv) => {
                self.position.play_unchecked(mv);
                self.history.push(position_hash(&self.position));
                Ok(())
            }
            None => Err(ChessError::IllegalMove(format!("{}{}", from, to))),
        }
    }

    fn is_game_over(&self) -> bool {
        self.position.is_game_over() || self.is_fifty_move_draw() || self.is_threefold_repetition()
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn legal_destinations(&self, from: Square) -> Vec<Square> {
        let mut destinations: Vec<Square> = self
            .position
            .legal_moves()
            .iter()
            .filter_map(|mv| self.endpoints(mv))
            .filter(|(origin, _)| *origin == from)
            .map(|(_, to)| to)
            .collect();
        // Four promotion choices share one destination
        destinations.dedup();
        destinations
    }
}

fn to_engine_square(square: Square) -> shakmaty::Square {
    shakmaty::Square::from_coords(
        File::new(u32::from(square.file)),
        Rank::new(u32::from(7 - square.rank)),
    )
}

fn from_engine_square(square: shakmaty::Square) -> Square {
    let file = u32::from(square.file()) as u8;
    let rank = u32::from(square.rank()) as u8;
    Square::new_unchecked(file, 7 - rank)
}

fn from_engine_color(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

fn from_engine_role(role: Role) -> PieceType {
    match role {
        Role::Pawn => PieceType::Pawn,
        Role::Knight => PieceType::Knight,
        Role::Bishop => PieceType::Bishop,
        Role::Rook => PieceType::Rook,
        Role::Queen => PieceType::Queen,
        Role::King => PieceType::King,
    }
}

fn to_engine_role(kind: PieceType) -> Role {
    match kind {
        PieceType::Pawn => Role::Pawn,
        PieceType::Knight => Role::Knight,
        PieceType::Bishop => Role::Bishop,
        PieceType::Rook => Role::Rook,
        PieceType::Queen => Role::Queen,
        PieceType::King => Role::King,
    }
}
