//! One running game.
//!
//! A session owns its rules engine and the two player identities. Every
//! accepted move produces a separate redacted view for each side; nothing
//! about check is ever computed here.

use super::{GameError, GameId, GameResult, PlayerId};
use crate::chess::{Board, Color, PieceType, RulesEngine, Square};
use crate::fog::{self, VisibleSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub white: PlayerId,
    pub black: PlayerId,
}

impl Players {
    pub fn color_of(&self, player: PlayerId) -> Option<Color> {
        if player == self.white {
            Some(Color::White)
        } else if player == self.black {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn get(&self, color: Color) -> PlayerId {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    /// Any other terminal position, e.g. insufficient material
    Draw,
    Resignation,
    Disconnect,
}

/// Session lifecycle. Only ever moves forward:
/// `Waiting -> InProgress -> Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Waiting,
    InProgress,
    Ended {
        reason: EndReason,
        winner: Option<Color>,
    },
}

impl Status {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Status::InProgress)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Status::Ended { .. })
    }
}

/// What one side is allowed to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub board: Board,
    pub visible: VisibleSet,
}

impl PlayerView {
    pub fn compute(board: &Board, color: Color) -> Self {
        Self {
            board: fog::filter_board(board, color),
            visible: fog::visible_squares(board, color),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSummary {
    pub from: Square,
    pub to: Square,
}

/// Result of an accepted move. The shared fields go to both players; each
/// player additionally gets only their own view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub mv: MoveSummary,
    pub turn: Color,
    pub is_game_over: bool,
    pub is_checkmate: bool,
    /// Set only on checkmate
    pub winner: Option<Color>,
    pub white_view: PlayerView,
    pub black_view: PlayerView,
}

impl MoveOutcome {
    pub fn view_for(&self, color: Color) -> &PlayerView {
        match color {
            Color::White => &self.white_view,
            Color::Black => &self.black_view,
        }
    }
}

/// A game ended by one player leaving it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOver {
    pub reason: EndReason,
    pub winner: Color,
}

pub struct GameSession {
    id: GameId,
    rules: Box<dyn RulesEngine>,
    players: Players,
    status: Status,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("players", &self.players)
            .field("status", &self.status)
            .field("turn", &self.rules.turn())
            .finish()
    }
}

impl GameSession {
    /// Start a game between two paired players
    pub fn new(id: GameId, rules: Box<dyn RulesEngine>, players: Players) -> Self {
        Self {
            id,
            rules,
            players,
            status: Status::InProgress,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn players(&self) -> Players {
        self.players
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn turn(&self) -> Color {
        self.rules.turn()
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.color_of(player).is_some()
    }

    /// Redacted view of the current position for one side
    pub fn view(&self, color: Color) -> PlayerView {
        PlayerView::compute(&self.rules.board(), color)
    }

    pub fn submit_move(
        &mut self,
        requester: PlayerId,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> GameResult<MoveOutcome> {
        if !self.status.is_in_progress() {
            return Err(GameError::SessionInactive);
        }

        let mover = self.rules.turn();
        if requester != self.players.get(mover) {
            return Err(GameError::NotYourTurn);
        }

        self.rules.apply_move(from, to, promotion)?;
        debug!(game_id = %self.id, %from, %to, "Move applied");

        let is_game_over = self.rules.is_game_over();
        let is_checkmate = self.rules.is_checkmate();
        let winner = self.rules.winner();

        if is_game_over {
            let reason = if is_checkmate {
                EndReason::Checkmate
            } else if self.rules.is_stalemate() {
                EndReason::Stalemate
            } else {
                EndReason::Draw
            };
            self.status = Status::Ended { reason, winner };
            info!(game_id = %self.id, ?reason, ?winner, "Game finished");
        }

        let board = self.rules.board();
        Ok(MoveOutcome {
            mv: MoveSummary { from, to },
            turn: self.rules.turn(),
            is_game_over,
            is_checkmate,
            winner,
            white_view: PlayerView::compute(&board, Color::White),
            black_view: PlayerView::compute(&board, Color::Black),
        })
    }

    /// Legal destinations from `square`, or nothing if the requester cannot
    /// see that square. Destinations themselves are not filtered.
    pub fn query_moves(&self, requester: PlayerId, square: Square) -> GameResult<Vec<Square>> {
        let color = self
            .players
            .color_of(requester)
            .ok_or(GameError::NotAPlayer)?;

        if !self.status.is_in_progress() {
            return Ok(Vec::new());
        }

        let board = self.rules.board();
        if !fog::visible_squares(&board, color).contains(square) {
            return Ok(Vec::new());
        }

        Ok(self.rules.legal_destinations(square))
    }

    pub fn resign(&mut self, requester: PlayerId) -> GameResult<GameOver> {
        let color = self
            .players
            .color_of(requester)
            .ok_or(GameError::NotAPlayer)?;
        if !self.status.is_in_progress() {
            return Err(GameError::SessionInactive);
        }

        Ok(self.finish(EndReason::Resignation, color.opposite()))
    }

    /// End the game in favour of whoever is left. `None` when `player` is not
    /// part of this game or the game is already over.
    pub fn handle_disconnect(&mut self, player: PlayerId) -> Option<GameOver> {
        let color = self.players.color_of(player)?;
        if !self.status.is_in_progress() {
            return None;
        }

        Some(self.finish(EndReason::Disconnect, color.opposite()))
    }

    fn finish(&mut self, reason: EndReason, winner: Color) -> GameOver {
        self.status = Status::Ended {
            reason,
            winner: Some(winner),
        };
        info!(game_id = %self.id, ?reason, %winner, "Game finished");
        GameOver { reason, winner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::StandardRules;

    const WHITE: PlayerId = PlayerId(1);
    const BLACK: PlayerId = PlayerId(2);

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn session_from(rules: StandardRules) -> GameSession {
        GameSession::new(
            "g_test".to_string(),
            Box::new(rules),
            Players {
                white: WHITE,
                black: BLACK,
            },
        )
    }

    fn session() -> GameSession {
        session_from(StandardRules::new())
    }

    #[test]
    fn test_new_session_is_in_progress() {
        let s = session();
        assert_eq!(s.status(), Status::InProgress);
        assert_eq!(s.turn(), Color::White);
        assert!(s.has_player(WHITE));
        assert!(!s.has_player(PlayerId(99)));
    }

    #[test]
    fn test_move_out_of_turn_changes_nothing() {
        let mut s = session();
        let before = s.view(Color::White);
        assert_eq!(
            s.submit_move(BLACK, sq("e7"), sq("e5"), None),
            Err(GameError::NotYourTurn)
        );
        assert_eq!(
            s.submit_move(PlayerId(42), sq("e2"), sq("e4"), None),
            Err(GameError::NotYourTurn)
        );
        assert_eq!(s.turn(), Color::White);
        assert_eq!(s.view(Color::White), before);
    }

    #[test]
    fn test_illegal_move_rejected() {
        let mut s = session();
        let result = s.submit_move(WHITE, sq("e2"), sq("e5"), None);
        assert!(matches!(result, Err(GameError::IllegalMove(_))));
        assert_eq!(s.turn(), Color::White);
    }

    #[test]
    fn test_accepted_move_produces_per_side_views() {
        let mut s = session();
        let outcome = s.submit_move(WHITE, sq("e2"), sq("e4"), None).unwrap();
        assert_eq!(outcome.turn, Color::Black);
        assert!(!outcome.is_game_over);
        assert_eq!(outcome.winner, None);

        let white = outcome.view_for(Color::White);
        assert!(white.visible.contains(sq("e4")));
        assert!(white.board.is_occupied(sq("e4")));
        let black = outcome.view_for(Color::Black);
        assert!(!black.visible.contains(sq("e4")));
        assert!(!black.board.is_occupied(sq("e4")));
    }

    #[test]
    fn test_checkmate_ends_game_with_mover_as_winner() {
        let mut s = session();
        s.submit_move(WHITE, sq("f2"), sq("f3"), None).unwrap();
        s.submit_move(BLACK, sq("e7"), sq("e5"), None).unwrap();
        s.submit_move(WHITE, sq("g2"), sq("g4"), None).unwrap();
        let outcome = s.submit_move(BLACK, sq("d8"), sq("h4"), None).unwrap();

        assert!(outcome.is_game_over);
        assert!(outcome.is_checkmate);
        assert_eq!(outcome.winner, Some(Color::Black));
        assert_eq!(
            s.status(),
            Status::Ended {
                reason: EndReason::Checkmate,
                winner: Some(Color::Black)
            }
        );
        assert_eq!(
            s.submit_move(WHITE, sq("e2"), sq("e3"), None),
            Err(GameError::SessionInactive)
        );
    }

    #[test]
    fn test_stalemate_ends_without_winner() {
        let mut s = session_from(StandardRules::from_fen("7k/8/6Q1/8/8/8/8/K7 w - - 0 1").unwrap());
        let outcome = s.submit_move(WHITE, sq("g6"), sq("f7"), None).unwrap();
        assert!(outcome.is_game_over);
        assert!(!outcome.is_checkmate);
        assert_eq!(outcome.winner, None);
        assert_eq!(
            s.status(),
            Status::Ended {
                reason: EndReason::Stalemate,
                winner: None
            }
        );
    }

    #[test]
    fn test_query_moves_requires_visibility() {
        let s = session();
        assert_eq!(s.query_moves(WHITE, sq("g1")).unwrap().len(), 2);
        // Black's knight is hidden from white
        assert!(s.query_moves(WHITE, sq("g8")).unwrap().is_empty());
        // Black can see its own knight even though it is not black's turn
        assert!(s.query_moves(BLACK, sq("g8")).unwrap().is_empty());
        assert_eq!(s.query_moves(PlayerId(7), sq("g1")), Err(GameError::NotAPlayer));
    }

    #[test]
    fn test_resign_awards_opponent() {
        let mut s = session();
        let over = s.resign(WHITE).unwrap();
        assert_eq!(over.winner, Color::Black);
        assert_eq!(over.reason, EndReason::Resignation);
        assert!(s.status().is_ended());
        assert_eq!(s.resign(BLACK), Err(GameError::SessionInactive));
    }

    #[test]
    fn test_disconnect_only_applies_to_players_in_progress() {
        let mut s = session();
        assert_eq!(s.handle_disconnect(PlayerId(5)), None);
        let over = s.handle_disconnect(BLACK).unwrap();
        assert_eq!(over.winner, Color::White);
        assert_eq!(over.reason, EndReason::Disconnect);
        // Status never moves backwards or gets rewritten
        assert_eq!(s.handle_disconnect(WHITE), None);
        assert_eq!(
            s.status(),
            Status::Ended {
                reason: EndReason::Disconnect,
                winner: Some(Color::White)
            }
        );
    }
}
