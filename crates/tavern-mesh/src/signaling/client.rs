//! WebSocket connection to the relay.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tavern_common::{ClientMessage, Result, ServerMessage, TavernError};
use tavern_config::ClientConfig;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use super::{SignalingEvent, SignalingSink};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle to the relay connection.
///
/// Messages are queued to a background task that owns the socket. Clones
/// share the same connection. There is no automatic reconnect: the relay
/// assigns a new identity per connection, so callers must rejoin.
#[derive(Clone)]
pub struct SignalingClient {
    command_tx: mpsc::UnboundedSender<ClientMessage>,
}

impl SignalingClient {
    /// Connect to `config.server_url` and start the background task.
    /// Returns `(client, event_receiver)`.
    pub async fn connect(
        config: &ClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SignalingEvent>)> {
        let url = config.server_url.as_str();
        info!(url, "Connecting to relay");

        let ws = match tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            tokio_tungstenite::connect_async(url),
        )
        .await
        {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(e)) => return Err(TavernError::Network(format!("connection failed: {e}"))),
            Err(_elapsed) => {
                return Err(TavernError::Network(format!(
                    "connection timed out after {}s",
                    config.connect_timeout_secs
                )))
            }
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(connection_loop(ws, command_rx, event_tx));

        Ok((Self { command_tx }, event_rx))
    }

    /// Queue a message for the relay.
    pub fn send_message(&self, msg: ClientMessage) -> Result<()> {
        self.command_tx
            .send(msg)
            .map_err(|_| TavernError::Network("signaling connection closed".into()))
    }

    pub fn is_connected(&self) -> bool {
        !self.command_tx.is_closed()
    }
}

#[async_trait]
impl SignalingSink for SignalingClient {
    async fn send(&self, msg: ClientMessage) -> Result<()> {
        self.send_message(msg)
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

async fn connection_loop(
    ws: Ws,
    mut command_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::UnboundedSender<SignalingEvent>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                let Some(msg) = cmd else {
                    // Every handle dropped.
                    let _ = sink.close().await;
                    break;
                };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode message");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(msg) => {
                                if event_tx.send(SignalingEvent::Message(msg)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "Unrecognized message from relay");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sink.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Relay closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    command_rx.close();
    let _ = event_tx.send(SignalingEvent::Disconnected);
}
