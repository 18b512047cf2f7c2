//! Pairing connections into sessions and tearing them down

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::game::registry::SessionRegistry;
use crate::game::scheduler::SessionScheduler;
use crate::game::session::{ParticipantId, SessionState, Slot};
use crate::game::simulation::{self, MatchStatus, ServeDirection};
use crate::ws::connections::ConnectionTable;
use crate::ws::protocol::ServerMsg;

/// Serializes session pairing against teardown. Two simultaneous
/// connections must not both claim the same waiting session, and a join
/// must not interleave with the removal of the session it is claiming.
pub type PairingLock = Arc<Mutex<()>>;

/// Pairs each new connection with the waiting session, or opens a new one.
pub struct Matchmaker {
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionTable>,
    scheduler: SessionScheduler,
    pairing: PairingLock,
}

impl Matchmaker {
    pub fn new(
        registry: Arc<SessionRegistry>,
        connections: Arc<ConnectionTable>,
        scheduler: SessionScheduler,
        pairing: PairingLock,
    ) -> Self {
        Self {
            registry,
            connections,
            scheduler,
            pairing,
        }
    }

    /// Handle a new participant connection
    pub async fn connect(&self, participant: ParticipantId) {
        let _guard = self.pairing.lock().await;

        let waiting = self
            .registry
            .find_waiting_session()
            .and_then(|id| self.registry.get(id));

        match waiting {
            Some(session) => {
                let slot_a = {
                    let mut state = session.state();
                    debug_assert!(state.slot_b.is_none());
                    state.slot_b = Some(participant);
                    state.sim.status = MatchStatus::Playing;

                    // Opening serve goes toward the newcomer's side
                    let SessionState { sim, rng, .. } = &mut *state;
                    simulation::serve(sim, rng, ServeDirection::TowardRight);

                    state.slot_a
                };
                self.registry.index_participant(participant, session.id);

                self.connections.send(
                    slot_a,
                    ServerMsg::GameStart {
                        role: Slot::A,
                        session_id: session.id,
                    },
                );
                self.connections.send(
                    participant,
                    ServerMsg::GameStart {
                        role: Slot::B,
                        session_id: session.id,
                    },
                );

                self.scheduler.start(session.clone());

                info!(
                    session_id = %session.id,
                    participant = %participant,
                    "second participant joined, session is playing"
                );
            }
            None => {
                let session = self.registry.create(participant);
                self.connections.send(participant, ServerMsg::WaitingForPlayer);

                info!(
                    session_id = %session.id,
                    participant = %participant,
                    "no waiting session, participant holds for an opponent"
                );
            }
        }
    }
}

/// Tears a session down when either participant leaves. The tick task is
/// cancelled and awaited before the session is deleted, so no tick can
/// observe a half-removed session.
#[derive(Clone)]
pub struct DisconnectHandler {
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionTable>,
    scheduler: SessionScheduler,
    pairing: PairingLock,
}

impl DisconnectHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        connections: Arc<ConnectionTable>,
        scheduler: SessionScheduler,
        pairing: PairingLock,
    ) -> Self {
        Self {
            registry,
            connections,
            scheduler,
            pairing,
        }
    }

    /// Handle a participant disconnect. Unknown participants are a no-op:
    /// the disconnect may have raced with an earlier teardown.
    pub async fn disconnect(&self, participant: ParticipantId) {
        let _guard = self.pairing.lock().await;

        let Some(session_id) = self.registry.find_by_participant(participant) else {
            return;
        };
        let Some(session) = self.registry.get(session_id) else {
            return;
        };

        self.scheduler.cancel(&session).await;

        let survivor = session.state().opponent_of(participant);
        if let Some(survivor) = survivor {
            self.connections.send(survivor, ServerMsg::OpponentDisconnected);
        }

        self.registry.remove(session_id);

        info!(
            session_id = %session_id,
            participant = %participant,
            "participant disconnected, session torn down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use uuid::Uuid;

    struct Fixture {
        registry: Arc<SessionRegistry>,
        connections: Arc<ConnectionTable>,
        matchmaker: Matchmaker,
        disconnect: DisconnectHandler,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(SessionRegistry::new());
        let connections = Arc::new(ConnectionTable::new());
        let scheduler = SessionScheduler::new(registry.clone(), connections.clone());
        let pairing = PairingLock::default();
        let matchmaker = Matchmaker::new(
            registry.clone(),
            connections.clone(),
            scheduler.clone(),
            pairing.clone(),
        );
        let disconnect =
            DisconnectHandler::new(registry.clone(), connections.clone(), scheduler, pairing);
        Fixture {
            registry,
            connections,
            matchmaker,
            disconnect,
        }
    }

    async fn connect(fx: &Fixture) -> (Uuid, UnboundedReceiver<ServerMsg>) {
        let participant = Uuid::new_v4();
        let rx = fx.connections.register(participant);
        fx.matchmaker.connect(participant).await;
        (participant, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMsg>) -> Vec<ServerMsg> {
        let mut msgs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_connect_opens_waiting_session() {
        let fx = fixture();
        let (p1, mut rx1) = connect(&fx).await;

        let session_id = fx.registry.find_by_participant(p1).expect("indexed");
        let session = fx.registry.get(session_id).unwrap();
        {
            let state = session.state();
            assert_eq!(state.slot_a, p1);
            assert!(state.slot_b.is_none());
            assert_eq!(state.sim.status, MatchStatus::Waiting);
        }

        let msgs = drain(&mut rx1);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], ServerMsg::WaitingForPlayer));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_connect_starts_the_match() {
        let fx = fixture();
        let (p1, mut rx1) = connect(&fx).await;
        let (p2, mut rx2) = connect(&fx).await;

        let session_id = fx.registry.find_by_participant(p1).unwrap();
        assert_eq!(fx.registry.find_by_participant(p2), Some(session_id));

        let session = fx.registry.get(session_id).unwrap();
        {
            let state = session.state();
            assert_eq!(state.slot_b, Some(p2));
            assert_eq!(state.sim.status, MatchStatus::Playing);
            // Served: full horizontal speed, random vertical sign
            assert_approx_eq::assert_approx_eq!(state.sim.ball.vx.abs(), 5.0);
            assert_approx_eq::assert_approx_eq!(state.sim.ball.vy.abs(), 2.0);
        }

        let msgs1 = drain(&mut rx1);
        assert!(msgs1.iter().any(|m| matches!(
            m,
            ServerMsg::GameStart { role: Slot::A, session_id: sid } if *sid == session_id
        )));

        let msgs2 = drain(&mut rx2);
        assert!(msgs2.iter().any(|m| matches!(
            m,
            ServerMsg::GameStart { role: Slot::B, session_id: sid } if *sid == session_id
        )));

        fx.disconnect.disconnect(p1).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_connect_opens_a_fresh_session() {
        let fx = fixture();
        let (p1, _rx1) = connect(&fx).await;
        let (_p2, _rx2) = connect(&fx).await;
        let (p3, mut rx3) = connect(&fx).await;

        let first = fx.registry.find_by_participant(p1).unwrap();
        let second = fx.registry.find_by_participant(p3).unwrap();
        assert_ne!(first, second);
        assert_eq!(fx.registry.active_sessions(), 2);

        let msgs = drain(&mut rx3);
        assert!(matches!(msgs[0], ServerMsg::WaitingForPlayer));

        fx.disconnect.disconnect(p1).await;
        fx.disconnect.disconnect(p3).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_notifies_survivor_and_removes_session() {
        let fx = fixture();
        let (p1, _rx1) = connect(&fx).await;
        let (p2, mut rx2) = connect(&fx).await;

        // Let the match run a few ticks
        tokio::time::sleep(Duration::from_millis(50)).await;

        fx.disconnect.disconnect(p1).await;
        let msgs = drain(&mut rx2);

        let disconnect_count = msgs
            .iter()
            .filter(|m| matches!(m, ServerMsg::OpponentDisconnected))
            .count();
        assert_eq!(disconnect_count, 1);

        assert_eq!(fx.registry.find_by_participant(p1), None);
        assert_eq!(fx.registry.find_by_participant(p2), None);
        assert_eq!(fx.registry.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_snapshot_after_disconnect() {
        let fx = fixture();
        let (p1, _rx1) = connect(&fx).await;
        let (_p2, mut rx2) = connect(&fx).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        fx.disconnect.disconnect(p1).await;
        drain(&mut rx2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(
            rx2.try_recv().is_err(),
            "tick task must stop with the session"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_creator_disconnect_removes_silently() {
        let fx = fixture();
        let (p1, _rx1) = connect(&fx).await;

        fx.disconnect.disconnect(p1).await;

        assert_eq!(fx.registry.active_sessions(), 0);
        assert_eq!(fx.registry.find_by_participant(p1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_for_unknown_participant_is_noop() {
        let fx = fixture();
        let (p1, _rx1) = connect(&fx).await;

        fx.disconnect.disconnect(Uuid::new_v4()).await;

        assert_eq!(fx.registry.active_sessions(), 1);
        assert!(fx.registry.find_by_participant(p1).is_some());

        // Repeated disconnects of the same participant stay no-ops
        fx.disconnect.disconnect(p1).await;
        fx.disconnect.disconnect(p1).await;
        assert_eq!(fx.registry.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_teardown_matches_fresh() {
        let fx = fixture();
        let (p1, _rx1) = connect(&fx).await;
        let (_p2, _rx2) = connect(&fx).await;

        fx.disconnect.disconnect(p1).await;
        assert_eq!(fx.registry.active_sessions(), 0);

        // The next connection starts a fresh waiting session
        let (p4, mut rx4) = connect(&fx).await;
        let msgs = drain(&mut rx4);
        assert!(matches!(msgs[0], ServerMsg::WaitingForPlayer));
        assert!(fx.registry.find_by_participant(p4).is_some());
    }
}
