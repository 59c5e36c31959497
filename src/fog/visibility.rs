//! Visibility engine.
//!
//! A side sees every square its own pieces stand on, plus what each piece's
//! vision rule adds:
//!
//! - pawns see the square ahead only while it is empty, the double step
//!   only from the start row through two empty squares, and a forward
//!   diagonal only when an enemy piece stands on it;
//! - knights and kings see all of their on-board offsets;
//! - bishops, rooks and queens see along each ray up to and including the
//!   first occupied square.
//!
//! Both functions are pure: the result depends on nothing but the board
//! and the color asked about.

use crate::chess::{Board, Color, PieceType, Square};
use serde::Serialize;
use std::collections::BTreeSet;

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (2, -1),
    (2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const DIAGONAL_RAYS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ORTHOGONAL_RAYS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Squares observable by one side, in a stable (file, rank) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VisibleSet(BTreeSet<Square>);

impl VisibleSet {
    pub fn contains(&self, square: Square) -> bool {
        self.0.contains(&square)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Square> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Square> {
        self.iter().collect()
    }

    fn insert(&mut self, square: Square) {
        self.0.insert(square);
    }
}

impl FromIterator<Square> for VisibleSet {
    fn from_iter<T: IntoIterator<Item = Square>>(iter: T) -> Self {
        VisibleSet(iter.into_iter().collect())
    }
}

/// Every square `color` can currently observe on `board`.
pub fn visible_squares(board: &Board, color: Color) -> VisibleSet {
    let mut visible = VisibleSet::default();
    for (square, piece) in board.pieces_of(color) {
        visible.insert(square);
        match piece.kind {
            PieceType::Pawn => pawn_vision(board, square, color, &mut visible),
            PieceType::Knight => offset_vision(square, &KNIGHT_OFFSETS, &mut visible),
            PieceType::King => offset_vision(square, &KING_OFFSETS, &mut visible),
            PieceType::Bishop => ray_vision(board, square, &DIAGONAL_RAYS, &mut visible),
            PieceType::Rook => ray_vision(board, square, &ORTHOGONAL_RAYS, &mut visible),
            PieceType::Queen => {
                ray_vision(board, square, &DIAGONAL_RAYS, &mut visible);
                ray_vision(board, square, &ORTHOGONAL_RAYS, &mut visible);
            }
        }
    }
    visible
}

/// Copy of `board` with every square outside `color`'s vision blanked.
pub fn filter_board(board: &Board, color: Color) -> Board {
    let visible = visible_squares(board, color);
    let mut redacted = Board::empty();
    for square in visible.iter() {
        redacted.set(square, board.get(square));
    }
    redacted
}

fn pawn_vision(board: &Board, from: Square, color: Color, visible: &mut VisibleSet) {
    let dir = color.forward();

    if let Some(front) = from.offset(0, dir) {
        if !board.is_occupied(front) {
            visible.insert(front);
            if from.rank == color.pawn_start_row() {
                if let Some(front2) = from.offset(0, 2 * dir) {
                    if !board.is_occupied(front2) {
                        visible.insert(front2);
                    }
                }
            }
        }
    }

    // Empty diagonals stay hidden; only a capturable enemy is revealed
    for df in [-1, 1] {
        if let Some(diagonal) = from.offset(df, dir) {
            if board
                .get(diagonal)
                .is_some_and(|piece| piece.color != color)
            {
                visible.insert(diagonal);
            }
        }
    }
}

fn offset_vision(from: Square, offsets: &[(i8, i8)], visible: &mut VisibleSet) {
    for &(df, dr) in offsets {
        if let Some(square) = from.offset(df, dr) {
            visible.insert(square);
        }
    }
}

fn ray_vision(board: &Board, from: Square, rays: &[(i8, i8)], visible: &mut VisibleSet) {
    for &(df, dr) in rays {
        let mut current = from.offset(df, dr);
        while let Some(square) = current {
            visible.insert(square);
            if board.is_occupied(square) {
                break;
            }
            current = square.offset(df, dr);
        }
    }
}
