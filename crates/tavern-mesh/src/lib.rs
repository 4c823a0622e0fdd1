//! tavern-mesh: client side of a tavern voice room.
//!
//! Tracks room presence, keeps one negotiation state machine per remote
//! member, and exchanges session descriptions and path candidates through
//! the relay so every pair of call participants holds a direct link.
//! Audio capture and the real-time transport are supplied by the host via
//! [`MediaSource`] and [`MediaTransport`].

pub mod chat;
pub mod media;
pub mod mesh;
pub mod session;
pub mod signaling;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use chat::ChatLog;
pub use media::{LocalStream, MediaSource, MediaTrack, RemoteStream};
pub use mesh::{MeshCommand, MeshCoordinator, MeshEvent};
pub use session::{PeerSession, PeerSessionManager, Role, SessionState};
pub use signaling::{SignalingClient, SignalingEvent, SignalingSink};
pub use transport::{
    LinkEvent, LinkEventKind, LinkEventSender, LinkRequest, LinkState, MediaTransport, PeerLink,
};
