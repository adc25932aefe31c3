//! WebSocket delivery of conversion events.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use coldpress_core::{ConversionEvent, EventSink};

use crate::metrics::{
    FILES_CONVERTED_TOTAL, FILES_FAILED_TOTAL, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_EVENTS_SENT, WS_LAG_EVENTS,
};
use crate::state::AppState;

/// Broadcaster for conversion events using a tokio broadcast channel.
///
/// The job runner emits into this through the [`EventSink`] trait; every
/// connected WebSocket client receives the JSON-serialized event.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<ConversionEvent>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversionEvent> {
        self.sender.subscribe()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for WsBroadcaster {
    fn emit(&self, event: ConversionEvent) {
        WS_EVENTS_SENT.with_label_values(&[event.kind()]).inc();
        match &event {
            ConversionEvent::FileComplete(completion) => {
                if completion.success {
                    FILES_CONVERTED_TOTAL.inc();
                } else {
                    FILES_FAILED_TOTAL.inc();
                }
            }
            ConversionEvent::JobComplete(result) => {
                debug!(
                    successful = result.successful,
                    failed = result.failed,
                    "broadcasting job completion"
                );
            }
            _ => {}
        }
        // Ignore send errors - they just mean no one is listening
        let _ = self.sender.send(event);
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.ws_broadcaster().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    // Forward broadcast events to this client
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket send failed, client disconnected");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to serialize ConversionEvent: {}", e);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, skipped {} events", n);
                    WS_LAG_EVENTS.inc();
                    // Keep receiving - progress snapshots supersede each other
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Broadcast channel closed");
                    break;
                }
            }
        }
    });

    // Handle incoming messages from the client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Ping(data)) => {
                // Pong is handled automatically by axum
                debug!("Received ping: {:?}", data);
            }
            Ok(Message::Text(text)) => {
                // No client messages are expected, but log them
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
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldpress_core::{ErrorDetail, FileCompletion};

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let broadcaster = WsBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        broadcaster.emit(ConversionEvent::Error(ErrorDetail {
            message: "boom".to_string(),
            file: None,
        }));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "error");
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_silent() {
        let broadcaster = WsBroadcaster::default();
        broadcaster.emit(ConversionEvent::FileComplete(FileCompletion {
            file: "a.flac".to_string(),
            success: true,
            error: None,
        }));
    }

    #[tokio::test]
    async fn test_wire_format_is_event_data_envelope() {
        let broadcaster = WsBroadcaster::default();
        let mut rx = broadcaster.subscribe();
        broadcaster.emit(ConversionEvent::FileComplete(FileCompletion {
            file: "a.flac".to_string(),
            success: false,
            error: Some("ffmpeg exited with code 1".to_string()),
        }));

        let event = rx.recv().await.unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "file-complete");
        assert_eq!(json["data"]["file"], "a.flac");
        assert_eq!(json["data"]["success"], false);
    }
}
