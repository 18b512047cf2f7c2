//! Matchmaking and session teardown

pub mod service;

pub use service::{DisconnectHandler, Matchmaker};
