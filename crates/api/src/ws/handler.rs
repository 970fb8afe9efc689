use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use smartrag_events::{
    ClientMessage, ConnectionId, ConnectionRegistry, OutboundFrame, ProtocolError, Registration,
    ServerMessage,
};

use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with the
/// [`ConnectionRegistry`] and served by two spawned tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.registry))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection and takes its outbound queue.
///   2. Spawns a sender task that writes queued frames to the sink.
///   3. Spawns a receiver task that answers client messages.
///   4. When either task ends, stops the other and unregisters.
///
/// The registry dropping the connection closes the queue, which ends the
/// sender task and so the whole connection.
async fn handle_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let Registration {
        id: conn_id,
        mut outbound,
    } = registry.register().await;
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward queued frames to the WebSocket sink.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let message = match frame {
                OutboundFrame::Message(msg) => match msg.to_json() {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::warn!(conn_id = %conn_id, error = %e, "Unserializable message dropped");
                        continue;
                    }
                },
                OutboundFrame::Ping => Message::Ping(Bytes::new()),
                OutboundFrame::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            };
            if sink.send(message).await.is_err() {
                tracing::debug!(conn_id = %conn_id, "WebSocket sink closed");
                return;
            }
        }
        let _ = sink.close().await;
    });

    // Receiver task: interpret inbound frames.
    let recv_registry = Arc::clone(&registry);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    handle_text(&recv_registry, conn_id, text.as_str()).await;
                }
                Ok(Message::Binary(_)) => {
                    let reply = ServerMessage::error(ProtocolError::BinaryFrame.to_string());
                    reply_to(&recv_registry, conn_id, reply).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    tracing::trace!(conn_id = %conn_id, "Control frame received");
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.unregister(conn_id).await;
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Answer one text frame. Malformed input gets an `error` reply and the
/// connection stays open.
async fn handle_text(registry: &ConnectionRegistry, conn_id: ConnectionId, text: &str) {
    let reply = match ClientMessage::parse(text) {
        Ok(ClientMessage::SubscribeTask { task_id }) => {
            let ack = ServerMessage::subscription_confirmed(task_id).into();
            match registry.subscribe_with_ack(conn_id, task_id, ack).await {
                Ok(added) => {
                    tracing::debug!(conn_id = %conn_id, task_id = %task_id, added, "Subscribed to task");
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, task_id = %task_id, error = %e, "Subscribe failed");
                }
            }
            return;
        }
        Ok(ClientMessage::UnsubscribeTask { task_id }) => {
            let removed = registry.unsubscribe(conn_id, task_id).await;
            tracing::debug!(conn_id = %conn_id, task_id = %task_id, removed, "Unsubscribed from task");
            return;
        }
        Ok(ClientMessage::Ping) => ServerMessage::pong(),
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "Rejected client frame");
            ServerMessage::error(e.to_string())
        }
    };
    reply_to(registry, conn_id, reply).await;
}

async fn reply_to(registry: &ConnectionRegistry, conn_id: ConnectionId, reply: ServerMessage) {
    if let Err(e) = registry.send_to(conn_id, reply.into()).await {
        tracing::debug!(conn_id = %conn_id, error = %e, "Reply not delivered");
    }
}
