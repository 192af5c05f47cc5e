//! WebSocket transport for per-user progress events.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use parcelwatch_core::{BatchId, ProgressAggregator, ProgressEvent, ProgressEventSink, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// How often idle connections get a heartbeat.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// A progress event for the connected user.
    Progress { event: ProgressEvent },
    /// One job of a batch completed. Sent to every client.
    BatchTick { batch_id: BatchId },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    fn metric_label(&self) -> &'static str {
        match self {
            WsMessage::Progress { event } => event.name(),
            WsMessage::BatchTick { .. } => "batch_tick",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// A message on the broadcast channel. `None` addresses every client.
#[derive(Debug, Clone)]
pub struct Addressed {
    pub user_id: Option<UserId>,
    pub message: WsMessage,
}

impl Addressed {
    fn is_for(&self, user_id: Option<UserId>) -> bool {
        match self.user_id {
            None => true,
            Some(target) => user_id == Some(target),
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
///
/// Doubles as the queue's event sink and progress aggregator.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<Addressed>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send a message to one user's connections, or to everyone.
    pub fn broadcast(&self, user_id: Option<UserId>, message: WsMessage) {
        // Ignore send errors - they just mean no one is listening
        let _ = self.sender.send(Addressed { user_id, message });
    }

    /// Subscribe to receive messages.
    pub fn subscribe(&self) -> broadcast::Receiver<Addressed> {
        self.sender.subscribe()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ProgressEventSink for WsBroadcaster {
    async fn send(&self, user_id: UserId, event: ProgressEvent) {
        self.broadcast(Some(user_id), WsMessage::Progress { event });
    }
}

#[async_trait]
impl ProgressAggregator for WsBroadcaster {
    async fn track_processed(&self, batch_id: BatchId) {
        self.broadcast(None, WsMessage::BatchTick { batch_id });
    }
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: Option<UserId>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.user_id))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: Option<UserId>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.ws_broadcaster().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected (user {:?})", user_id);

    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        loop {
            let msg = tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(addressed) if addressed.is_for(user_id) => addressed.message,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("WebSocket client lagged, skipped {} messages", n);
                            WS_LAG_EVENTS.inc();
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Broadcast channel closed");
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => WsMessage::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                },
            };

            WS_MESSAGES_SENT
                .with_label_values(&[msg.metric_label()])
                .inc();

            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize WsMessage: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected (user {:?})", user_id);
}
