//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::session::{SessionId, Slot};
use crate::game::simulation::SimState;

/// Movement directive carried by a `move` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Start or change paddle movement
    Move { direction: MoveDirection },

    /// Stop paddle movement
    Stop,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent to a solitary connection until an opponent arrives
    WaitingForPlayer,

    /// Both slots are filled and the match is starting
    GameStart { role: Slot, session_id: SessionId },

    /// Authoritative state snapshot, broadcast at tick rate
    GameState { state: SimState },

    /// The other participant left; the session is being torn down
    OpponentDisconnected,
}
