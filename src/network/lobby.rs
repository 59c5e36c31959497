//! Maps protocol messages onto the matchmaker and session registry.
//!
//! [`Lobby`] is plain synchronous state: the server feeds it one event at a
//! time from a single task, which is what keeps every mutation of a session
//! strictly ordered.

use crate::chess::{Color, PieceType, Square};
use crate::game::{
    EnqueueOutcome, GameError, GameId, GameResult, Matchmaker, PlayerId, SessionRegistry,
};
use crate::messages::{ClientMessage, ServerMessage};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// A message addressed to one player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub to: PlayerId,
    pub message: ServerMessage,
}

impl Outgoing {
    pub fn new(to: PlayerId, message: ServerMessage) -> Self {
        Self { to, message }
    }
}

pub struct Lobby {
    matchmaker: Matchmaker,
    registry: SessionRegistry,
    grace_period: Duration,
}

impl Lobby {
    pub fn new(grace_period: Duration) -> Self {
        Self::with_matchmaker(Matchmaker::new(), grace_period)
    }

    pub fn with_matchmaker(matchmaker: Matchmaker, grace_period: Duration) -> Self {
        Self {
            matchmaker,
            registry: SessionRegistry::new(),
            grace_period,
        }
    }

    pub fn matchmaker(&self) -> &Matchmaker {
        &self.matchmaker
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Apply one request from `player`. Failures turn into a single `error`
    /// reply to the sender and change nothing.
    #[instrument(level = "debug", skip(self, message, now), fields(kind = message.message_type()))]
    pub fn handle(
        &mut self,
        player: PlayerId,
        message: ClientMessage,
        now: Instant,
    ) -> Vec<Outgoing> {
        let result = match message {
            ClientMessage::FindGame => Ok(self.find_game(player)),
            ClientMessage::MakeMove {
                game_id,
                from,
                to,
                promotion,
            } => self.make_move(player, &game_id, from, to, promotion, now),
            ClientMessage::GetMoves { game_id, square } => {
                self.get_moves(player, &game_id, square)
            }
            ClientMessage::Resign { game_id } => self.resign(player, &game_id),
        };

        result.unwrap_or_else(|err| {
            warn!(%player, error = %err, "Rejected request");
            vec![Outgoing::new(player, ServerMessage::error(err.to_string()))]
        })
    }

    /// Connection dropped: free the waiting slot and forfeit any live game.
    pub fn disconnect(&mut self, player: PlayerId) -> Vec<Outgoing> {
        if self.matchmaker.cancel(player) {
            info!(%player, "Waiting player left before pairing");
        }

        let mut outgoing = Vec::new();
        for game_id in self.registry.sessions_of(player) {
            let Ok(session) = self.registry.get_mut(&game_id) else {
                continue;
            };
            // Games that already ended stay until their purge deadline
            let Some(over) = session.handle_disconnect(player) else {
                continue;
            };
            let remaining = session.players().get(over.winner);
            if let Some(message) = ServerMessage::game_over(&over) {
                outgoing.push(Outgoing::new(remaining, message));
            }
            self.registry.remove(&game_id);
            info!(%player, game_id = %game_id, "Game forfeited by disconnect");
        }
        outgoing
    }

    /// Drop naturally finished games whose grace period is over
    pub fn purge_expired(&mut self, now: Instant) -> Vec<GameId> {
        let purged = self.registry.purge_expired(now);
        if !purged.is_empty() {
            debug!(count = purged.len(), "Purged finished games");
        }
        purged
    }

    fn find_game(&mut self, player: PlayerId) -> Vec<Outgoing> {
        match self.matchmaker.enqueue(player) {
            EnqueueOutcome::Waiting => vec![Outgoing::new(player, ServerMessage::Waiting)],
            EnqueueOutcome::Paired(start) => {
                let players = start.session.players();
                let game_id = start.session.id().to_string();
                let outgoing = Color::ALL
                    .iter()
                    .map(|&color| {
                        Outgoing::new(
                            players.get(color),
                            ServerMessage::game_start(&game_id, color, &start),
                        )
                    })
                    .collect();

                if let Err(err) = self.registry.insert(start.session) {
                    error!(error = %err, "Could not register new game");
                    return Color::ALL
                        .iter()
                        .map(|&color| {
                            Outgoing::new(players.get(color), ServerMessage::error(err.to_string()))
                        })
                        .collect();
                }
                outgoing
            }
        }
    }

    fn make_move(
        &mut self,
        player: PlayerId,
        game_id: &str,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
        now: Instant,
    ) -> GameResult<Vec<Outgoing>> {
        let session = self.registry.get_mut(game_id)?;
        let outcome = session.submit_move(player, from, to, promotion)?;
        let players = session.players();

        if outcome.is_game_over {
            self.registry.schedule_removal(game_id, now + self.grace_period);
        }

        Ok(Color::ALL
            .iter()
            .map(|&color| Outgoing::new(players.get(color), ServerMessage::move_made(&outcome, color)))
            .collect())
    }

    fn get_moves(
        &self,
        player: PlayerId,
        game_id: &str,
        square: Square,
    ) -> GameResult<Vec<Outgoing>> {
        let moves = self.registry.get(game_id)?.query_moves(player, square)?;
        Ok(vec![Outgoing::new(player, ServerMessage::ValidMoves { moves })])
    }

    fn resign(&mut self, player: PlayerId, game_id: &str) -> GameResult<Vec<Outgoing>> {
        let session = self.registry.get_mut(game_id)?;
        let over = session.resign(player)?;
        let players = session.players();
        self.registry.remove(game_id);

        let message = ServerMessage::game_over(&over).ok_or(GameError::SessionInactive)?;
        Ok(Color::ALL
            .iter()
            .map(|&color| Outgoing::new(players.get(color), message.clone()))
            .collect())
    }
}
