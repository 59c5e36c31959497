use super::session::{GameSession, PlayerView, Players};
use super::{generate_game_id, PlayerId};
use crate::chess::{Color, RulesEngine, StandardRules};
use tracing::{debug, info};

/// Builds the rules engine for each new game
pub type RulesFactory = Box<dyn Fn() -> Box<dyn RulesEngine> + Send>;

/// A freshly paired game plus what each side sees of the starting position
#[derive(Debug)]
pub struct GameStart {
    pub session: GameSession,
    pub white_view: PlayerView,
    pub black_view: PlayerView,
    pub turn: Color,
}

impl GameStart {
    pub fn view_for(&self, color: Color) -> &PlayerView {
        match color {
            Color::White => &self.white_view,
            Color::Black => &self.black_view,
        }
    }
}

#[derive(Debug)]
pub enum EnqueueOutcome {
    /// Nobody to play against yet; the caller holds the waiting slot
    Waiting,
    Paired(Box<GameStart>),
}

/// Pairs players in arrival order. At most one player waits at a time; the
/// next different player to arrive is matched against them.
pub struct Matchmaker {
    waiting: Option<PlayerId>,
    rules_factory: RulesFactory,
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Matchmaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matchmaker")
            .field("waiting", &self.waiting)
            .finish_non_exhaustive()
    }
}

impl Matchmaker {
    /// Matchmaker whose games use standard chess rules
    pub fn new() -> Self {
        Self::with_rules(Box::new(|| Box::new(StandardRules::new())))
    }

    pub fn with_rules(rules_factory: RulesFactory) -> Self {
        Self {
            waiting: None,
            rules_factory,
        }
    }

    pub fn waiting(&self) -> Option<PlayerId> {
        self.waiting
    }

    pub fn is_waiting(&self, player: PlayerId) -> bool {
        self.waiting == Some(player)
    }

    /// Add a player looking for a game. The earlier arrival plays white.
    pub fn enqueue(&mut self, player: PlayerId) -> EnqueueOutcome {
        match self.waiting {
            Some(opponent) if opponent != player => {
                self.waiting = None;

                let players = Players {
                    white: opponent,
                    black: player,
                };
                let session = GameSession::new(generate_game_id(), (self.rules_factory)(), players);
                info!(
                    game_id = session.id(),
                    white = %players.white,
                    black = %players.black,
                    "Paired players"
                );

                let white_view = session.view(Color::White);
                let black_view = session.view(Color::Black);
                let turn = session.turn();
                EnqueueOutcome::Paired(Box::new(GameStart {
                    session,
                    white_view,
                    black_view,
                    turn,
                }))
            }
            _ => {
                debug!(%player, "Player waiting for an opponent");
                self.waiting = Some(player);
                EnqueueOutcome::Waiting
            }
        }
    }

    /// Drop `player` from the waiting slot. Returns whether they were waiting.
    pub fn cancel(&mut self, player: PlayerId) -> bool {
        if self.is_waiting(player) {
            self.waiting = None;
            debug!(%player, "Cleared waiting slot");
            true
        } else {
            false
        }
    }
}
