//! Commands into and events out of the mesh coordinator.

use tavern_common::{ChatMessage, ConnectionId, MemberInfo};

use crate::media::{LocalStream, RemoteStream};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Local user actions, fed to [`MeshCoordinator::run`](super::MeshCoordinator::run).
#[derive(Debug, Clone)]
pub enum MeshCommand {
    JoinRoom { room: String, display_name: String },
    LeaveRoom,
    JoinCall,
    LeaveCall,
    ToggleMute,
    SendChat { body: String },
    ReplaceStream(LocalStream),
    Shutdown,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the mesh for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    /// The relay assigned our identity.
    Connected { identity: ConnectionId },
    /// The known-members list changed. Never includes ourselves.
    MembersChanged(Vec<MemberInfo>),
    Chat(ChatMessage),
    MemberMuted { identity: ConnectionId, muted: bool },
    LocalMuteChanged(bool),
    CallStateChanged { in_call: bool },
    RemoteStreamAttached(RemoteStream),
    RemoteStreamRemoved { identity: ConnectionId },
    /// The relay rejected one of our requests.
    ValidationError(String),
    /// Local audio could not be acquired; the call was not entered.
    MediaUnavailable(String),
    Disconnected,
}
