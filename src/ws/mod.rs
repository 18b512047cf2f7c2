//! WebSocket transport modules

pub mod connections;
pub mod handler;
pub mod protocol;

pub use connections::ConnectionTable;
