//! Fixed-rate session ticking and snapshot publishing

use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::util::time::tick_duration;
use crate::ws::connections::ConnectionTable;
use crate::ws::protocol::ServerMsg;

use super::registry::SessionRegistry;
use super::session::{ParticipantId, Session, SessionState};
use super::simulation::{self, MatchStatus};

/// Drives one tick task per playing session. Tasks across sessions are
/// fully independent; within a session the interval serializes ticks and a
/// late tick is skipped, never run concurrently with the next one.
#[derive(Clone)]
pub struct SessionScheduler {
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionTable>,
}

impl SessionScheduler {
    pub fn new(registry: Arc<SessionRegistry>, connections: Arc<ConnectionTable>) -> Self {
        Self {
            registry,
            connections,
        }
    }

    /// Spawn the tick task for a session entering play
    pub fn start(&self, session: Arc<Session>) {
        let registry = Arc::clone(&self.registry);
        let connections = Arc::clone(&self.connections);
        let handle = tokio::spawn(run_ticker(registry, connections, Arc::clone(&session)));
        session.set_ticker(handle);
    }

    /// Cancel a session's tick task and wait for it to finish. After this
    /// returns no tick can execute against the session, including one that
    /// was already scheduled.
    pub async fn cancel(&self, session: &Session) {
        if let Some(handle) = session.take_ticker() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

async fn run_ticker(
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionTable>,
    session: Arc<Session>,
) {
    info!(session_id = %session.id, "tick loop started");

    let mut ticker = interval(tick_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        // Raced with teardown: a tick against a removed session is a no-op
        if !registry.contains(session.id) {
            break;
        }

        let (snapshot, targets) = {
            let mut state = session.state();
            if state.sim.status != MatchStatus::Playing {
                continue;
            }

            {
                let SessionState {
                    sim, intents, rng, ..
                } = &mut *state;
                simulation::advance(sim, *intents, rng);
            }

            let targets: Vec<ParticipantId> = state.participants().collect();
            (state.sim.clone(), targets)
        };

        let msg = ServerMsg::GameState { state: snapshot };
        for participant in targets {
            connections.send(participant, msg.clone());
        }
    }

    info!(session_id = %session.id, "tick loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::simulation::BALL_SPEED_X;
    use std::time::Duration;
    use uuid::Uuid;

    struct Fixture {
        registry: Arc<SessionRegistry>,
        connections: Arc<ConnectionTable>,
        scheduler: SessionScheduler,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(SessionRegistry::new());
        let connections = Arc::new(ConnectionTable::new());
        let scheduler = SessionScheduler::new(registry.clone(), connections.clone());
        Fixture {
            registry,
            connections,
            scheduler,
        }
    }

    /// Create a playing two-participant session with a served ball
    fn playing_session(fx: &Fixture) -> (Arc<Session>, Uuid, Uuid) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let session = fx.registry.create(a);
        {
            let mut state = session.state();
            state.slot_b = Some(b);
            state.sim.status = MatchStatus::Playing;
            let SessionState { sim, rng, .. } = &mut *state;
            simulation::serve(sim, rng, simulation::ServeDirection::TowardRight);
        }
        fx.registry.index_participant(b, session.id);
        (session, a, b)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_advance_and_broadcast() {
        let fx = fixture();
        let (session, a, b) = playing_session(&fx);
        let mut rx_a = fx.connections.register(a);
        let mut rx_b = fx.connections.register(b);

        fx.scheduler.start(session.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(session.state().sim.ball.x > 400.0);

        let mut snapshots = 0;
        while let Ok(msg) = rx_a.try_recv() {
            assert!(matches!(msg, ServerMsg::GameState { .. }));
            snapshots += 1;
        }
        assert!(snapshots > 0, "slot A should receive snapshots");
        assert!(rx_b.try_recv().is_ok(), "slot B should receive snapshots");

        fx.scheduler.cancel(&session).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_session_does_not_advance() {
        let fx = fixture();
        let a = Uuid::new_v4();
        let session = fx.registry.create(a);
        let mut rx = fx.connections.register(a);

        // Contrived: the matchmaker never schedules a waiting session, but
        // a tick that does run against one must leave it untouched.
        fx.scheduler.start(session.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = session.state();
        assert_approx_eq::assert_approx_eq!(state.sim.ball.x, 400.0);
        assert_approx_eq::assert_approx_eq!(state.sim.ball.vx, 0.0);
        drop(state);
        assert!(rx.try_recv().is_err(), "no snapshots while waiting");

        fx.scheduler.cancel(&session).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks_for_good() {
        let fx = fixture();
        let (session, a, _b) = playing_session(&fx);
        let mut rx = fx.connections.register(a);

        fx.scheduler.start(session.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;

        fx.scheduler.cancel(&session).await;
        while rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err(), "no snapshot may arrive after cancel");
        assert!(session.take_ticker().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_against_removed_session_is_noop() {
        let fx = fixture();
        let (session, a, _b) = playing_session(&fx);
        let mut rx = fx.connections.register(a);

        // Remove before the loop ever observes the session
        fx.registry.remove(session.id);
        fx.scheduler.start(session.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = session.state();
        assert_approx_eq::assert_approx_eq!(state.sim.ball.x, 400.0);
        assert_approx_eq::assert_approx_eq!(state.sim.ball.vx, BALL_SPEED_X);
        drop(state);
        assert!(rx.try_recv().is_err());
    }
}
