//! Registry of all live sessions

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::session::{ParticipantId, Session, SessionId};
use super::simulation::MatchStatus;

/// Owns every live session and the `participant -> session` index that
/// makes connection-id lookups constant-time. The registry itself is a
/// concurrent map; find-and-claim atomicity during matchmaking is provided
/// by the matchmaker's join lock.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    by_participant: DashMap<ParticipantId, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            by_participant: DashMap::new(),
        }
    }

    /// Open a new waiting session with `slot_a` as its creator
    pub fn create(&self, slot_a: ParticipantId) -> Arc<Session> {
        let id = Uuid::new_v4();
        let seed = rand::random::<u64>();
        let session = Arc::new(Session::new(id, slot_a, seed));
        self.sessions.insert(id, session.clone());
        self.by_participant.insert(slot_a, id);
        session
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| s.value().clone())
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// First session still waiting for an opponent, if any
    pub fn find_waiting_session(&self) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|entry| entry.value().state().sim.status == MatchStatus::Waiting)
            .map(|entry| *entry.key())
    }

    pub fn find_by_participant(&self, participant: ParticipantId) -> Option<SessionId> {
        self.by_participant.get(&participant).map(|entry| *entry.value())
    }

    /// Record a slot B claim in the participant index
    pub fn index_participant(&self, participant: ParticipantId, session_id: SessionId) {
        self.by_participant.insert(participant, session_id);
    }

    /// Delete a session and its index entries. Callers must have cancelled
    /// the session's tick task already. Removing an absent id is a no-op.
    pub fn remove(&self, id: SessionId) {
        if let Some((_, session)) = self.sessions.remove(&id) {
            let state = session.state();
            self.by_participant.remove(&state.slot_a);
            if let Some(slot_b) = state.slot_b {
                self.by_participant.remove(&slot_b);
            }
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_participants(&self) -> usize {
        self.by_participant.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_opens_waiting_session() {
        let registry = SessionRegistry::new();
        let creator = Uuid::new_v4();

        let session = registry.create(creator);

        assert_eq!(registry.active_sessions(), 1);
        assert_eq!(registry.active_participants(), 1);
        assert_eq!(registry.find_by_participant(creator), Some(session.id));
        assert_eq!(registry.find_waiting_session(), Some(session.id));

        let state = session.state();
        assert_eq!(state.slot_a, creator);
        assert!(state.slot_b.is_none());
        assert_eq!(state.sim.status, MatchStatus::Waiting);
    }

    #[test]
    fn test_find_waiting_skips_playing_sessions() {
        let registry = SessionRegistry::new();
        let first = registry.create(Uuid::new_v4());
        first.state().sim.status = MatchStatus::Playing;

        assert_eq!(registry.find_waiting_session(), None);

        let second = registry.create(Uuid::new_v4());
        assert_eq!(registry.find_waiting_session(), Some(second.id));
    }

    #[test]
    fn test_remove_clears_both_index_entries() {
        let registry = SessionRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let session = registry.create(a);
        session.state().slot_b = Some(b);
        registry.index_participant(b, session.id);

        assert_eq!(registry.find_by_participant(b), Some(session.id));

        registry.remove(session.id);

        assert_eq!(registry.active_sessions(), 0);
        assert_eq!(registry.active_participants(), 0);
        assert_eq!(registry.find_by_participant(a), None);
        assert_eq!(registry.find_by_participant(b), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        let session = registry.create(Uuid::new_v4());

        registry.remove(session.id);
        registry.remove(session.id);
        registry.remove(Uuid::new_v4());

        assert_eq!(registry.active_sessions(), 0);
    }
}
