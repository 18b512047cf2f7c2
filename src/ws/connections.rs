//! Outbound message delivery to connected participants

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::game::session::ParticipantId;

use super::protocol::ServerMsg;

/// Live connections keyed by participant id. Senders are unbounded so a
/// send never blocks a simulation tick; a missing or closed entry means the
/// participant is already gone and the message is dropped.
pub struct ConnectionTable {
    connections: DashMap<ParticipantId, mpsc::UnboundedSender<ServerMsg>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection and hand back the receiving half its writer
    /// task drains.
    pub fn register(&self, participant: ParticipantId) -> mpsc::UnboundedReceiver<ServerMsg> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(participant, tx);
        rx
    }

    pub fn remove(&self, participant: ParticipantId) {
        self.connections.remove(&participant);
    }

    /// Fire-and-forget delivery to one participant
    pub fn send(&self, participant: ParticipantId, msg: ServerMsg) {
        if let Some(tx) = self.connections.get(&participant) {
            let _ = tx.send(msg);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}
