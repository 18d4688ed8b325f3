//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::snapshot;
use crate::game::PlayerInput;
use crate::http::routes::AppError;
use crate::util::time::unix_millis;
use crate::ws::connections::ConnectionInfo;
use crate::ws::protocol::{ClientMsg, ServerMsg};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;
type WsStream = futures::stream::SplitStream<WebSocket>;

/// Query parameters for the registration upgrade
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterQuery {
    /// Display name
    #[serde(default)]
    pub ign: String,
    /// Cosmetic skin
    #[serde(default)]
    pub skin_id: Option<String>,
}

/// Transport-level failures; they end only the connection they happen on
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("WebSocket transport error: {0}")]
    Transport(#[from] axum::Error),
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<RegisterQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let ign = query.ign.trim().to_string();
    if ign.is_empty() {
        warn!("Registration without a player name");
        return Err(AppError::BadRequest("Missing player name (ign)".to_string()));
    }

    info!(ign = %ign, "WebSocket upgrade for player");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, ign, query.skin_id, state)))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, ign: String, skin_id: Option<String>, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut ws_sink, ws_stream) = socket.split();

    let game_match = state.match_registry.current_or_create();
    let actor = game_match.register_player(&ign, skin_id);

    // Subscribe before announcing, so the first frame after registration is not missed
    let snapshot_rx = game_match.subscribe();

    state.connections.register(ConnectionInfo {
        connection_id,
        actor_id: actor.id,
        match_id: game_match.id(),
        ign: ign.clone(),
        connected_at: unix_millis(),
    });

    info!(
        connection_id = %connection_id,
        actor_id = %actor.id,
        match_id = %game_match.id(),
        ign = %ign,
        match_connections = state.connections.for_match(&game_match.id()).len(),
        "Registered player"
    );

    let registered = snapshot::registered(game_match.id(), &actor);
    match send_msg(&mut ws_sink, &registered).await {
        Ok(()) => {
            run_session(connection_id, ws_sink, ws_stream, state.input_tx.clone(), snapshot_rx).await;
        }
        Err(e) => {
            error!(connection_id = %connection_id, error = %e, "Failed to send registration");
        }
    }

    // Cleanup on disconnect; the actor itself stays in the match
    if let Some(conn) = state.connections.remove(&connection_id) {
        info!(
            connection_id = %connection_id,
            actor_id = %conn.actor_id,
            ign = %conn.ign,
            session_ms = unix_millis().saturating_sub(conn.connected_at),
            "WebSocket connection closed"
        );
    }
}

/// Run the WebSocket session with read/write split.
/// Ends when either side stops; the other side is torn down with it.
async fn run_session(
    connection_id: Uuid,
    ws_sink: WsSink,
    ws_stream: WsStream,
    input_tx: mpsc::Sender<PlayerInput>,
    snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    // Spawn writer task: match broadcasts -> WebSocket
    let mut writer_handle = tokio::spawn(write_loop(connection_id, ws_sink, snapshot_rx));

    tokio::select! {
        result = &mut writer_handle => {
            if let Ok(Err(e)) = result {
                warn!(connection_id = %connection_id, error = %e, "WebSocket send failed, closing connection");
            }
        }
        _ = read_loop(connection_id, ws_stream, input_tx) => {}
    }

    writer_handle.abort();
}

/// Writer loop: match broadcasts -> WebSocket. Returns on the first failed write.
async fn write_loop(
    connection_id: Uuid,
    mut ws_sink: WsSink,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) -> Result<(), ConnectionError> {
    loop {
        match snapshot_rx.recv().await {
            Ok(msg) => send_msg(&mut ws_sink, &msg).await?,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    connection_id = %connection_id,
                    lagged_count = n,
                    "Client lagged, skipping {} frames", n
                );
                // Continue - don't disconnect for lag
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(connection_id = %connection_id, "Frame channel closed");
                return Ok(());
            }
        }
    }
}

/// Reader loop: WebSocket -> event processor
async fn read_loop(connection_id: Uuid, mut ws_stream: WsStream, input_tx: mpsc::Sender<PlayerInput>) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match ClientMsg::parse(&text) {
                Ok(msg) => {
                    let input = PlayerInput {
                        connection_id,
                        msg,
                        received_at: unix_millis(),
                    };

                    if input_tx.send(input).await.is_err() {
                        debug!(connection_id = %connection_id, "Input channel closed");
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                let e = ConnectionError::from(e);
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), ConnectionError> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
