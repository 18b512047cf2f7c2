//! Participant intent intake

use std::sync::Arc;

use super::registry::SessionRegistry;
use super::session::ParticipantId;
use super::Intent;
use crate::ws::protocol::MoveDirection;

impl From<MoveDirection> for Intent {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Intent::Up,
            MoveDirection::Down => Intent::Down,
        }
    }
}

/// Translates move/stop events into per-session intent state. Latest intent
/// wins; events for unknown participants are dropped silently because they
/// may have raced with a disconnect.
#[derive(Clone)]
pub struct InputGateway {
    registry: Arc<SessionRegistry>,
}

impl InputGateway {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn on_move(&self, participant: ParticipantId, direction: MoveDirection) {
        self.apply(participant, direction.into());
    }

    pub fn on_stop(&self, participant: ParticipantId) {
        self.apply(participant, Intent::Idle);
    }

    fn apply(&self, participant: ParticipantId, intent: Intent) {
        let Some(session_id) = self.registry.find_by_participant(participant) else {
            return;
        };
        let Some(session) = self.registry.get(session_id) else {
            return;
        };

        let mut state = session.state();
        if let Some(slot) = state.slot_of(participant) {
            state.set_intent(slot, intent);
        }
    }
}
