use super::{ChessError, Color, Piece, Square};

/// Piece placement snapshot of a position.
///
/// Pure grid: side to move, castling rights and clocks belong to the
/// [`RulesEngine`](super::RulesEngine) that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Board {
    /// squares[rank][file], rank 0 = eighth rank, file 0 = file a
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Standard chess starting position
    pub fn starting_position() -> Self {
        use super::PieceType::*;
        const BACK_RANK: [super::PieceType; 8] =
            [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

        let mut board = Self::empty();
        for (file, kind) in BACK_RANK.iter().enumerate() {
            board.squares[0][file] = Some(Piece::new(*kind, Color::Black));
            board.squares[1][file] = Some(Piece::new(Pawn, Color::Black));
            board.squares[6][file] = Some(Piece::new(Pawn, Color::White));
            board.squares[7][file] = Some(Piece::new(*kind, Color::White));
        }
        board
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        self.squares[square.rank as usize][square.file as usize]
    }

    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.rank as usize][square.file as usize] = piece;
    }

    pub fn is_occupied(&self, square: Square) -> bool {
        self.get(square).is_some()
    }

    /// Rows in wire order (eighth rank first)
    pub fn rows(&self) -> &[[Option<Piece>; 8]; 8] {
        &self.squares
    }

    /// Every occupied square of the given color
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |square| {
            self.get(square)
                .filter(|piece| piece.color == color)
                .map(|piece| (square, piece))
        })
    }

    /// Build a board from the piece-placement field of a FEN string
    /// Example: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"
    pub fn from_placement(placement: &str) -> Result<Self, ChessError> {
        let placement = placement.trim();
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            let found_ranks = ranks.len();
            return Err(ChessError::InvalidFen(format!(
                "Piece placement must have exactly 8 ranks separated by '/', found {found_ranks}"
            )));
        }

        let mut board = Self::empty();
        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let fen_rank_number = 8 - rank_idx;
            let mut file = 0usize;

            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(ChessError::InvalidFen(format!(
                            "Invalid empty-square count '{c}' in rank {fen_rank_number}"
                        )));
                    }
                    file += skip as usize;
                } else {
                    if file >= 8 {
                        return Err(ChessError::InvalidFen(format!(
                            "Rank {fen_rank_number} has more than 8 squares"
                        )));
                    }
                    let piece = Piece::from_fen_char(c)?;
                    board.squares[rank_idx][file] = Some(piece);
                    file += 1;
                }
            }

            if file != 8 {
                return Err(ChessError::InvalidFen(format!(
                    "Rank {fen_rank_number} must describe exactly 8 squares, found {file}"
                )));
            }
        }

        Ok(board)
    }
}
