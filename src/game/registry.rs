use super::{GameError, GameId, GameResult, GameSession, PlayerId};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

struct Entry {
    session: GameSession,
    /// Set once the game ended naturally; the entry is dropped by the first
    /// purge at or after this instant.
    expires_at: Option<Instant>,
}

/// Active sessions keyed by game id.
///
/// Games ended by resignation or disconnect are removed straight away;
/// games that finish on the board linger until their deadline so the final
/// move can still be delivered, then [`SessionRegistry::purge_expired`]
/// drops them.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<GameId, Entry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn insert(&mut self, session: GameSession) -> GameResult<()> {
        let id = session.id().to_string();
        if self.sessions.contains_key(&id) {
            return Err(GameError::DuplicateSession(id));
        }
        self.sessions.insert(
            id,
            Entry {
                session,
                expires_at: None,
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> GameResult<&GameSession> {
        self.sessions
            .get(id)
            .map(|entry| &entry.session)
            .ok_or_else(|| GameError::SessionNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> GameResult<&mut GameSession> {
        self.sessions
            .get_mut(id)
            .map(|entry| &mut entry.session)
            .ok_or_else(|| GameError::SessionNotFound(id.to_string()))
    }

    pub fn remove(&mut self, id: &str) -> Option<GameSession> {
        let removed = self.sessions.remove(id).map(|entry| entry.session);
        if removed.is_some() {
            debug!(game_id = id, "Session removed");
        }
        removed
    }

    /// Keep the session around until `at`, then let the purge take it.
    /// Rescheduling never extends an existing deadline.
    pub fn schedule_removal(&mut self, id: &str, at: Instant) {
        if let Some(entry) = self.sessions.get_mut(id) {
            entry.expires_at = Some(match entry.expires_at {
                Some(existing) => existing.min(at),
                None => at,
            });
        }
    }

    /// Remove every session whose deadline has passed
    pub fn purge_expired(&mut self, now: Instant) -> Vec<GameId> {
        let expired: Vec<GameId> = self
            .sessions
            .iter()
            .filter(|(_, entry)| entry.expires_at.is_some_and(|at| at <= now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.remove(id);
        }
        expired
    }

    /// Ids of every session `player` takes part in. Empty when there is none.
    pub fn sessions_of(&self, player: PlayerId) -> Vec<GameId> {
        self.sessions
            .iter()
            .filter(|(_, entry)| entry.session.has_player(player))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
