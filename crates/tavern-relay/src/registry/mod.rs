//! Presence registry: who is connected to which room.
//!
//! Owns every Participant and Room record. Operations are synchronous and
//! run to completion; the relay decides what to broadcast from the values
//! they return, so the registry never touches a network channel.


use std::collections::HashMap;

use tavern_common::{
    validate_field, validate_optional_body, ChatMessage, ConnectionId, Field, MemberInfo,
    ValidationError,
};
use tavern_config::LimitsConfig;

/// One joined connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: ConnectionId,
    pub display_name: String,
    pub room: String,
    pub muted: bool,
}

impl Participant {
    fn info(&self) -> MemberInfo {
        MemberInfo {
            identity: self.identity.clone(),
            display_name: self.display_name.clone(),
            muted: self.muted,
        }
    }
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Trimmed room name the identity now belongs to.
    pub room: String,
    /// Trimmed display name stored for the identity.
    pub display_name: String,
    /// Other members of the room, in join order.
    pub others: Vec<MemberInfo>,
    /// Set when the join moved the identity out of another room.
    pub previous: Option<Departure>,
}

/// Result of a leave that removed a Participant record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub identity: ConnectionId,
    pub display_name: String,
    pub room: String,
    /// Members still in the room after the departure.
    pub remaining: Vec<ConnectionId>,
}

/// Result of a mute change for a known identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteChange {
    pub room: String,
    /// Room members other than the one who toggled.
    pub others: Vec<ConnectionId>,
}

/// A chat line ready for fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDelivery {
    pub message: ChatMessage,
    pub recipients: Vec<ConnectionId>,
}

/// Participant and room tables.
///
/// Rooms keep members in join order so `room-users` listings are stable.
/// A room exists exactly while it has at least one member.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    limits: LimitsConfig,
    participants: HashMap<ConnectionId, Participant>,
    rooms: HashMap<String, Vec<ConnectionId>>,
}

impl PresenceRegistry {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            limits,
            participants: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Add `identity` to `room` under `display_name`.
    ///
    /// Both values are validated before anything changes. An identity that is
    /// already in a room leaves it first, so membership is always single-room.
    pub fn join(
        &mut self,
        identity: &ConnectionId,
        room: &str,
        display_name: &str,
    ) -> Result<Membership, ValidationError> {
        let display_name =
            validate_field(Field::DisplayName, display_name, self.limits.max_display_name_len)?;
        let room = validate_field(Field::Room, room, self.limits.max_room_len)?;

        let previous = self.leave(identity);

        let members = self.rooms.entry(room.clone()).or_default();
        let others: Vec<MemberInfo> = members
            .iter()
            .filter_map(|id| self.participants.get(id))
            .map(Participant::info)
            .collect();
        members.push(identity.clone());

        self.participants.insert(
            identity.clone(),
            Participant {
                identity: identity.clone(),
                display_name: display_name.clone(),
                room: room.clone(),
                muted: false,
            },
        );

        Ok(Membership {
            room,
            display_name,
            others,
            previous,
        })
    }

    /// Remove `identity` from its room. Returns `None` when it had no record,
    /// which makes repeated calls harmless.
    pub fn leave(&mut self, identity: &ConnectionId) -> Option<Departure> {
        let participant = self.participants.remove(identity)?;

        let remaining = match self.rooms.get_mut(&participant.room) {
            Some(members) => {
                members.retain(|id| id != identity);
                members.clone()
            }
            None => Vec::new(),
        };
        if remaining.is_empty() {
            self.rooms.remove(&participant.room);
        }

        Some(Departure {
            identity: participant.identity,
            display_name: participant.display_name,
            room: participant.room,
            remaining,
        })
    }

    /// Update the mute flag. Unknown identities are ignored.
    pub fn set_muted(&mut self, identity: &ConnectionId, muted: bool) -> Option<MuteChange> {
        let participant = self.participants.get_mut(identity)?;
        participant.muted = muted;
        let room = participant.room.clone();
        let others = self.others_in_room(&room, identity);
        Some(MuteChange { room, others })
    }

    /// Validate a chat line and work out who receives it.
    ///
    /// `Ok(None)` means nothing should be sent: the sender never joined or
    /// the body is blank. Chat is only accepted for the sender's own room.
    pub fn send(
        &self,
        identity: &ConnectionId,
        room: &str,
        body: &str,
    ) -> Result<Option<ChatDelivery>, ValidationError> {
        let Some(participant) = self.participants.get(identity) else {
            return Ok(None);
        };
        let Some(body) = validate_optional_body(body, self.limits.max_chat_len)? else {
            return Ok(None);
        };
        let room = room.trim();
        if room != participant.room {
            return Err(ValidationError::NotInRoom {
                room: room.to_string(),
            });
        }

        Ok(Some(ChatDelivery {
            message: ChatMessage::from_member(
                identity.clone(),
                &participant.display_name,
                body,
            ),
            recipients: self.room_members(room),
        }))
    }

    /// Members of `room` in join order; empty for unknown rooms.
    pub fn room_members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    /// Members of `room` except `identity`.
    pub fn others_in_room(&self, room: &str, identity: &ConnectionId) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().filter(|id| *id != identity).cloned().collect())
            .unwrap_or_default()
    }

    pub fn participant(&self, identity: &ConnectionId) -> Option<&Participant> {
        self.participants.get(identity)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Drop every room and participant. Limits are kept.
    pub fn reset(&mut self) {
        self.participants.clear();
        self.rooms.clear();
    }
}
