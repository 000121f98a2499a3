//! Kitchen display WebSocket endpoint
//!
//! GET /api/kitchens/{kitchen_id}/ws?subscriberId=<id>
//!
//! 协议:
//! - Server → Display: DisplayMessage (Ready 全量快照, Event 单个变更)
//! - Display → Server: DisplayCommand (Resync)
//!
//! 推送只是提示，显示屏仍按周期轮询 ListOrders。

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::kitchen::{DisplayCommand, DisplayMessage};

use crate::api::run_blocking;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/kitchens/{kitchen_id}/ws", get(handle_kitchen_ws))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    /// Stable id of the display; a random one is assigned when absent
    subscriber_id: Option<String>,
}

/// GET /api/kitchens/:kitchen_id/ws
pub async fn handle_kitchen_ws(
    State(state): State<ServerState>,
    Path(kitchen_id): Path<i64>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let subscriber_id = query
        .subscriber_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    ws.on_upgrade(move |socket| kitchen_ws_session(socket, state, kitchen_id, subscriber_id))
}

async fn kitchen_ws_session(socket: WebSocket, state: ServerState, kitchen_id: i64, subscriber_id: String) {
    let (mut sink, mut stream) = socket.split();

    // Join before the snapshot so no change falls between the two
    let mut hub_rx = state.hub().join(kitchen_id, &subscriber_id);
    tracing::info!(kitchen_id, subscriber_id = %subscriber_id, "Kitchen display connected");

    if send_snapshot(&mut sink, &state, kitchen_id).await.is_err() {
        drop(hub_rx);
        state.hub().release(kitchen_id, &subscriber_id);
        return;
    }

    let mut ping_interval = tokio::time::interval(state.config.ws_ping_interval());
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }

            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = hub_rx.recv() => {
                match event {
                    Some(event) => {
                        if send_message(&mut sink, &DisplayMessage::Event { event }).await.is_err() {
                            break;
                        }
                    }
                    // Replaced by a newer session with the same subscriber id
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<DisplayCommand>(&text) {
                        Ok(DisplayCommand::Resync) => {
                            if send_snapshot(&mut sink, &state, kitchen_id).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(kitchen_id, error = %e, "Ignoring unknown display command");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    drop(hub_rx);
    state.hub().release(kitchen_id, &subscriber_id);
    tracing::info!(kitchen_id, subscriber_id = %subscriber_id, "Kitchen display disconnected");
}

async fn send_snapshot<S>(sink: &mut S, state: &ServerState, kitchen_id: i64) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let orders = match run_blocking(state, move |m| m.list_orders(kitchen_id)).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::warn!(kitchen_id, error = %e.message, "Kitchen snapshot failed");
            return Err(());
        }
    };
    send_message(sink, &DisplayMessage::Ready { orders }).await
}

async fn send_message<S>(sink: &mut S, msg: &DisplayMessage) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
