use super::error::ChessError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A board coordinate.
///
/// `rank` is the internal row index: row 0 is the eighth rank and row 7 the
/// first, so the algebraic rank digit is `8 - rank`. This matches the row
/// order of the board arrays sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    pub file: u8, // 0-7 corresponding to a-h
    pub rank: u8, // 0-7 corresponding to 8-1
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Result<Self, ChessError> {
        if file > 7 {
            return Err(ChessError::InvalidSquare(format!(
                "File must be 0-7, got {}",
                file
            )));
        }
        if rank > 7 {
            return Err(ChessError::InvalidSquare(format!(
                "Rank must be 0-7, got {}",
                rank
            )));
        }

        Ok(Self { file, rank })
    }

    /// Create square without validation (for internal use when bounds are guaranteed)
    pub const fn new_unchecked(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    /// Create square from file and rank characters, e.g. ('e', '4')
    pub fn from_chars(file: char, rank: char) -> Result<Self, ChessError> {
        let file_lower = file.to_ascii_lowercase();
        if !('a'..='h').contains(&file_lower) {
            return Err(ChessError::InvalidSquare(format!(
                "Invalid file '{}'. Must be a-h.",
                file
            )));
        }

        if !('1'..='8').contains(&rank) {
            return Err(ChessError::InvalidSquare(format!(
                "Invalid rank '{}'. Must be 1-8.",
                rank
            )));
        }

        Ok(Square {
            file: file_lower as u8 - b'a',
            rank: b'8' - rank as u8,
        })
    }

    pub fn file_char(&self) -> char {
        (self.file + b'a') as char
    }

    pub fn rank_char(&self) -> char {
        (b'8' - self.rank) as char
    }

    /// Step by (file, rank) deltas; `None` once the result leaves the board.
    pub fn offset(&self, df: i8, dr: i8) -> Option<Square> {
        let file = self.file as i8 + df;
        let rank = self.rank as i8 + dr;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Square::new_unchecked(file as u8, rank as u8))
        } else {
            None
        }
    }

    /// All 64 squares, row by row starting at a8.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8).flat_map(|rank| (0..8).map(move |file| Square { file, rank }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Square {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => Self::from_chars(file, rank),
            _ => Err(ChessError::InvalidSquare(format!(
                "Square must be exactly 2 characters (e.g., 'e4'), got '{}'",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Square {
    type Error = ChessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algebraic_mapping_inverts_rank() {
        let a8 = Square::new(0, 0).unwrap();
        assert_eq!(a8.to_string(), "a8");
        let h1 = Square::new(7, 7).unwrap();
        assert_eq!(h1.to_string(), "h1");
        let e2: Square = "e2".parse().unwrap();
        assert_eq!((e2.file, e2.rank), (4, 6));
    }

    #[test]
    fn test_mapping_is_bijective() {
        let all: Vec<Square> = Square::all().collect();
        assert_eq!(all.len(), 64);
        for square in all {
            assert_eq!(square.to_string().parse::<Square>().unwrap(), square);
        }
    }

    #[test]
    fn test_invalid_squares_rejected() {
        for input in ["", "e", "e9", "i1", "e44", "4e"] {
            assert!(input.parse::<Square>().is_err(), "{} should not parse", input);
        }
        assert!(Square::new(8, 0).is_err());
    }

    #[test]
    fn test_offset_discards_out_of_bounds() {
        let a1: Square = "a1".parse().unwrap();
        assert_eq!(a1.offset(-1, 0), None);
        assert_eq!(a1.offset(0, 1), None);
        assert_eq!(a1.offset(1, -2), Some("b3".parse().unwrap()));
    }

    #[test]
    fn test_serde_uses_algebraic_string() {
        let square: Square = "d5".parse().unwrap();
        assert_eq!(serde_json::to_string(&square).unwrap(), "\"d5\"");
        let back: Square = serde_json::from_str("\"d5\"").unwrap();
        assert_eq!(back, square);
        assert!(serde_json::from_str::<Square>("\"z0\"").is_err());
    }
}
