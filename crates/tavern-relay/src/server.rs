//! TCP accept loop.

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::connection::handle_connection;
use crate::relay::SignalingRelay;

/// Accept connections forever, one task per client.
pub async fn serve(listener: TcpListener, relay: SignalingRelay) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let relay = relay.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, relay).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tavern_common::{ClientMessage, ConnectionId, ServerMessage};
    use tavern_config::LimitsConfig;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start() -> (String, SignalingRelay) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = SignalingRelay::new(LimitsConfig::default());
        tokio::spawn(serve(listener, relay.clone()));
        (format!("ws://{addr}"), relay)
    }

    async fn recv(ws: &mut Ws) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("ws error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn send(ws: &mut Ws, msg: &ClientMessage) {
        let json = serde_json::to_string(msg).unwrap();
        ws.send(Message::Text(json.into())).await.unwrap();
    }

    async fn connect(url: &str) -> (Ws, ConnectionId) {
        let (mut ws, _) = connect_async(url).await.unwrap();
        match recv(&mut ws).await {
            ServerMessage::Welcome { identity } => (ws, identity),
            other => panic!("expected welcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_and_chat_over_websocket() {
        let (url, _relay) = start().await;
        let (mut a, a_id) = connect(&url).await;
        let (mut b, _) = connect(&url).await;

        send(
            &mut a,
            &ClientMessage::JoinRoom {
                room: "tavern".into(),
                display_name: "Pike".into(),
            },
        )
        .await;
        assert_eq!(recv(&mut a).await, ServerMessage::RoomUsers { members: vec![] });
        assert!(matches!(recv(&mut a).await, ServerMessage::ChatMessage(_)));

        send(
            &mut b,
            &ClientMessage::JoinRoom {
                room: "tavern".into(),
                display_name: "Vex".into(),
            },
        )
        .await;
        match recv(&mut b).await {
            ServerMessage::RoomUsers { members } => assert_eq!(members[0].identity, a_id),
            other => panic!("expected room-users, got {other:?}"),
        }
        assert!(matches!(recv(&mut a).await, ServerMessage::MemberJoined { .. }));
        assert!(matches!(recv(&mut a).await, ServerMessage::ChatMessage(_)));
        assert!(matches!(recv(&mut b).await, ServerMessage::ChatMessage(_)));

        send(
            &mut b,
            &ClientMessage::SendChat {
                room: "tavern".into(),
                body: "  hi  ".into(),
            },
        )
        .await;
        for ws in [&mut a, &mut b] {
            match recv(ws).await {
                ServerMessage::ChatMessage(chat) => {
                    assert_eq!(chat.body, "hi");
                    assert_eq!(chat.author, "Vex");
                }
                other => panic!("expected chat, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn malformed_frames_are_ignored() {
        let (url, _relay) = start().await;
        let (mut a, _) = connect(&url).await;

        a.send(Message::Text("not json".into())).await.unwrap();
        a.send(Message::Text(r#"{"event":"format-disk"}"#.into()))
            .await
            .unwrap();
        send(
            &mut a,
            &ClientMessage::JoinRoom {
                room: "tavern".into(),
                display_name: "Pike".into(),
            },
        )
        .await;
        assert_eq!(recv(&mut a).await, ServerMessage::RoomUsers { members: vec![] });
    }

    #[tokio::test]
    async fn socket_close_runs_leave() {
        let (url, relay) = start().await;
        let (mut a, _) = connect(&url).await;
        let (mut b, b_id) = connect(&url).await;

        send(
            &mut a,
            &ClientMessage::JoinRoom {
                room: "tavern".into(),
                display_name: "Pike".into(),
            },
        )
        .await;
        recv(&mut a).await;
        recv(&mut a).await;

        send(
            &mut b,
            &ClientMessage::JoinRoom {
                room: "tavern".into(),
                display_name: "Vex".into(),
            },
        )
        .await;
        assert!(matches!(recv(&mut a).await, ServerMessage::MemberJoined { .. }));
        recv(&mut a).await;

        b.close(None).await.unwrap();

        assert_eq!(
            recv(&mut a).await,
            ServerMessage::MemberLeft {
                identity: b_id,
                display_name: "Vex".into()
            }
        );
        assert_eq!(relay.room_members("tavern").await.len(), 1);
    }
}
