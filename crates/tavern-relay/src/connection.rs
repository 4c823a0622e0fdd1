//! Per-connection handler: register, then pump frames both ways.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tavern_common::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::relay::SignalingRelay;

/// Handle a single WebSocket connection until either side closes it.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    relay: SignalingRelay,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. Register; the relay queues the welcome message for us.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let identity = relay.connect(tx).await;

    tracing::info!(peer = %addr, identity = %identity, "Client connected");

    // 2. Forwarding loop.
    loop {
        tokio::select! {
            // Queued messages for this client → WebSocket
            Some(msg) = rx.recv() => {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(identity = %identity, error = %e, "Failed to encode message");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            // WebSocket → relay
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => relay.handle(&identity, msg).await,
                            Err(e) => {
                                tracing::warn!(identity = %identity, error = %e, "Ignoring malformed message");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!(identity = %identity, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 3. Cleanup, same path as an explicit leave.
    tracing::info!(peer = %addr, identity = %identity, "Client disconnected");
    relay.disconnect(&identity).await;
}
