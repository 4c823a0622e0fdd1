//! Wire protocol between clients and the relay.
//!
//! Every WebSocket text frame carries exactly one message encoded as
//! `{"event": "<kebab-case name>", "data": {...}}`. Session descriptions and
//! path candidates are opaque to the relay; it forwards them verbatim along
//! with the negotiation id that ties each one to a single offer/answer
//! exchange.

use serde::{Deserialize, Serialize};

use crate::id::{ConnectionId, NegotiationId};

/// Author name used for notices generated by the relay itself.
pub const SYSTEM_AUTHOR: &str = "System";

// ---------------------------------------------------------------------------
// Negotiation payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// A session description produced by the media transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A network path candidate, using the field names of the host media stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Presence and chat payloads
// ---------------------------------------------------------------------------

/// One entry of a `room-users` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub identity: ConnectionId,
    pub display_name: String,
    #[serde(default)]
    pub muted: bool,
}

/// A chat line as broadcast to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    /// Sender identity; absent for system notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ConnectionId>,
    pub body: String,
    /// RFC 3339 UTC timestamp assigned by the relay.
    pub timestamp: String,
}

impl ChatMessage {
    pub fn system(body: impl Into<String>) -> Self {
        Self {
            author: SYSTEM_AUTHOR.to_string(),
            from: None,
            body: body.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn from_member(identity: ConnectionId, author: &str, body: impl Into<String>) -> Self {
        Self {
            author: author.to_string(),
            from: Some(identity),
            body: body.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.from.is_none() && self.author == SYSTEM_AUTHOR
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// The client request a `validation-error` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    JoinRoom,
    SendChat,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Messages a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinRoom {
        room: String,
        display_name: String,
    },
    LeaveRoom,
    SendChat {
        room: String,
        body: String,
    },
    ToggleMute {
        muted: bool,
    },
    NegotiationOffer {
        target: ConnectionId,
        negotiation: NegotiationId,
        offer: SessionDescription,
    },
    NegotiationAnswer {
        target: ConnectionId,
        negotiation: NegotiationId,
        answer: SessionDescription,
    },
    NegotiationCandidate {
        target: ConnectionId,
        negotiation: NegotiationId,
        candidate: IceCandidate,
    },
}

/// Messages the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        identity: ConnectionId,
    },
    RoomUsers {
        members: Vec<MemberInfo>,
    },
    MemberJoined {
        identity: ConnectionId,
        display_name: String,
    },
    MemberLeft {
        identity: ConnectionId,
        display_name: String,
    },
    MemberMuted {
        identity: ConnectionId,
        muted: bool,
    },
    ChatMessage(ChatMessage),
    NegotiationOffer {
        from: ConnectionId,
        from_name: String,
        negotiation: NegotiationId,
        offer: SessionDescription,
    },
    NegotiationAnswer {
        from: ConnectionId,
        negotiation: NegotiationId,
        answer: SessionDescription,
    },
    NegotiationCandidate {
        from: ConnectionId,
        negotiation: NegotiationId,
        candidate: IceCandidate,
    },
    ValidationError {
        request: RequestKind,
        message: String,
    },
}
