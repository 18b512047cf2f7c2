//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{InputGateway, SessionRegistry, SessionScheduler};
use crate::matchmaking::service::PairingLock;
use crate::matchmaking::{DisconnectHandler, Matchmaker};
use crate::ws::ConnectionTable;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub connections: Arc<ConnectionTable>,
    pub matchmaker: Arc<Matchmaker>,
    pub input: InputGateway,
    pub disconnect: DisconnectHandler,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let registry = Arc::new(SessionRegistry::new());
        let connections = Arc::new(ConnectionTable::new());

        let scheduler = SessionScheduler::new(registry.clone(), connections.clone());
        let pairing = PairingLock::default();

        let matchmaker = Arc::new(Matchmaker::new(
            registry.clone(),
            connections.clone(),
            scheduler.clone(),
            pairing.clone(),
        ));
        let input = InputGateway::new(registry.clone());
        let disconnect = DisconnectHandler::new(
            registry.clone(),
            connections.clone(),
            scheduler,
            pairing,
        );

        Self {
            config,
            registry,
            connections,
            matchmaker,
            input,
            disconnect,
        }
    }
}
