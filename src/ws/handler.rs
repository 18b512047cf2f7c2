//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::util::rate_limit::InputRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    // The connection id doubles as the participant identity in the core
    let participant = Uuid::new_v4();
    info!(participant = %participant, "new WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let mut outbox = state.connections.register(participant);

    // Writer task: core events -> WebSocket
    let writer_participant = participant;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(participant = %writer_participant, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Pair up or start waiting
    state.matchmaker.connect(participant).await;

    // Reader loop: WebSocket -> intent state
    let rate_limiter = InputRateLimiter::new();
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(participant = %participant, "rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Move { direction }) => {
                        state.input.on_move(participant, direction);
                    }
                    Ok(ClientMsg::Stop) => {
                        state.input.on_stop(participant);
                    }
                    Err(e) => {
                        warn!(participant = %participant, error = %e, "ignoring malformed client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(participant = %participant, "received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(participant = %participant, "client initiated close");
                break;
            }
            Err(e) => {
                error!(participant = %participant, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Tear down the session (if any) before the connection disappears, so
    // the survivor notification can still be routed.
    state.disconnect.disconnect(participant).await;
    state.connections.remove(participant);
    writer_handle.abort();

    info!(participant = %participant, "WebSocket connection closed");
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
