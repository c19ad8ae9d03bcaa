//! WebSocket handler streaming a terminal's output live.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use super::handlers::AppState;
use super::types::WsMessage;
use crate::session::SessionId;

/// Interval between server pings.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(terminal_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, terminal_id))
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, msg: &WsMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => false,
    }
}

/// Forward every new output line until the shell exits or the client leaves.
async fn handle_socket(socket: WebSocket, state: AppState, terminal_id: String) {
    let (mut sink, mut stream) = socket.split();

    let subscription = terminal_id
        .parse::<SessionId>()
        .and_then(|id| state.registry.get(id))
        .map(|session| session.subscribe());

    let mut lines = match subscription {
        Ok(Some(lines)) => lines,
        Ok(None) => {
            send(&mut sink, &WsMessage::Closed).await;
            return;
        }
        Err(_) => {
            let err = WsMessage::Error {
                code: "TERMINAL_NOT_FOUND".to_string(),
                message: format!("Terminal {} not found", terminal_id),
            };
            send(&mut sink, &err).await;
            return;
        }
    };

    debug!(terminal = %terminal_id, "websocket subscribed");
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let msg = match line {
                    Ok(data) => WsMessage::Line { data },
                    Err(RecvError::Lagged(skipped)) => WsMessage::Lagged { skipped },
                    Err(RecvError::Closed) => {
                        send(&mut sink, &WsMessage::Closed).await;
                        break;
                    }
                };
                if !send(&mut sink, &msg).await {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(WsMessage::Ping) = serde_json::from_str::<WsMessage>(text.as_str()) {
                        if !send(&mut sink, &WsMessage::Pong).await {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(terminal = %terminal_id, "websocket closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_message_ping_parse() {
        let msg: WsMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, WsMessage::Ping));
    }

    #[test]
    fn test_ws_message_lagged() {
        let json = serde_json::to_string(&WsMessage::Lagged { skipped: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"lagged","skipped":3}"#);
    }
}
