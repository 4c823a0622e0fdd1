//! Signaling channel to the relay.

mod client;

pub use client::SignalingClient;

use async_trait::async_trait;
use tavern_common::{ClientMessage, Result, ServerMessage};

/// Anything that can deliver a message to the relay.
#[async_trait]
pub trait SignalingSink: Send + Sync {
    async fn send(&self, msg: ClientMessage) -> Result<()>;
}

/// What the signaling connection reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    Message(ServerMessage),
    /// The transport closed. The identity is gone; rejoin on a new connection.
    Disconnected,
}
