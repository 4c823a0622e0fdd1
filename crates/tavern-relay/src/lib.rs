//! tavern-relay: room presence and signaling relay for tavern voice rooms.
//!
//! Clients connect over WebSocket, join a named room, chat, and exchange
//! negotiation payloads addressed to one another by connection identity.
//! The relay never inspects session descriptions or path candidates; it
//! only routes them.

pub mod connection;
pub mod registry;
pub mod relay;
pub mod server;

pub use registry::{Participant, PresenceRegistry};
pub use relay::SignalingRelay;
pub use server::serve;
