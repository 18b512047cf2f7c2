//! Per-session state: participants, intents, simulation

use parking_lot::{Mutex, MutexGuard};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::simulation::SimState;
use super::{Intent, IntentPair};

pub type SessionId = Uuid;
/// Per-connection unique identifier assigned by the transport layer
pub type ParticipantId = Uuid;

/// The two participant positions within a session. Slot A defends the left
/// edge, slot B the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "slot_a")]
    A,
    #[serde(rename = "slot_b")]
    B,
}

/// Everything a session owns besides its tick task. Slot A is filled at
/// creation; only slot B can be empty, and only while the session is
/// waiting for an opponent.
pub struct SessionState {
    pub slot_a: ParticipantId,
    pub slot_b: Option<ParticipantId>,
    pub intents: IntentPair,
    pub sim: SimState,
    /// Session-local randomness (vertical sign of each serve)
    pub rng: ChaCha8Rng,
}

impl SessionState {
    pub fn new(slot_a: ParticipantId, seed: u64) -> Self {
        Self {
            slot_a,
            slot_b: None,
            intents: IntentPair::default(),
            sim: SimState::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Which slot a participant occupies, if any
    pub fn slot_of(&self, participant: ParticipantId) -> Option<Slot> {
        if self.slot_a == participant {
            Some(Slot::A)
        } else if self.slot_b == Some(participant) {
            Some(Slot::B)
        } else {
            None
        }
    }

    /// The other participant of the session, if both slots are filled
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        match self.slot_of(participant)? {
            Slot::A => self.slot_b,
            Slot::B => Some(self.slot_a),
        }
    }

    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        [Some(self.slot_a), self.slot_b].into_iter().flatten()
    }

    pub fn set_intent(&mut self, slot: Slot, intent: Intent) {
        match slot {
            Slot::A => self.intents.a = intent,
            Slot::B => self.intents.b = intent,
        }
    }
}

/// A live session: mutex-guarded state plus the scheduling handle of its
/// tick task. The handle is present exactly while the session is playing.
pub struct Session {
    pub id: SessionId,
    state: Mutex<SessionState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(id: SessionId, slot_a: ParticipantId, seed: u64) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::new(slot_a, seed)),
            ticker: Mutex::new(None),
        }
    }

    /// Lock the session state. Critical sections must stay free of await
    /// points so an aborted tick task can never hold the lock.
    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    pub fn set_ticker(&self, handle: JoinHandle<()>) {
        let mut ticker = self.ticker.lock();
        debug_assert!(ticker.is_none(), "session already has a tick task");
        *ticker = Some(handle);
    }

    pub fn take_ticker(&self) -> Option<JoinHandle<()>> {
        self.ticker.lock().take()
    }
}
