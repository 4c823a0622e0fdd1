//! Per-remote negotiation state machines.

mod manager;
mod types;


pub use manager::PeerSessionManager;
pub use types::{PeerSession, Role, SessionState};
