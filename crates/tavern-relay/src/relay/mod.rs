//! Signaling relay: routes client messages and fans out room events.
//!
//! The registry and the table of live connections sit behind one async
//! mutex. Every handler takes the lock, mutates, queues its outbound
//! messages, and releases it, so no two handlers ever interleave.


use std::collections::HashMap;
use std::sync::Arc;

use tavern_common::{
    ChatMessage, ClientMessage, ConnectionId, RequestKind, ServerMessage, ValidationError,
};
use tavern_config::LimitsConfig;
use tokio::sync::{mpsc, Mutex};

use crate::registry::{Departure, PresenceRegistry};

/// Outbound queue of one connection.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

struct RelayState {
    registry: PresenceRegistry,
    connections: HashMap<ConnectionId, Outbound>,
}

impl RelayState {
    /// Queue `msg` for `target`. Returns false on a routing miss.
    fn send_to(&self, target: &ConnectionId, msg: ServerMessage) -> bool {
        match self.connections.get(target) {
            Some(tx) => {
                if tx.send(msg).is_err() {
                    tracing::debug!(identity = %target, "Outbound queue closed");
                    return false;
                }
                true
            }
            None => {
                tracing::debug!(identity = %target, "Routing miss: unknown identity");
                false
            }
        }
    }

    fn broadcast(&self, recipients: &[ConnectionId], msg: &ServerMessage) {
        for target in recipients {
            self.send_to(target, msg.clone());
        }
    }

    fn reject(&self, target: &ConnectionId, request: RequestKind, err: ValidationError) {
        tracing::debug!(identity = %target, ?request, error = %err, "Rejected request");
        self.send_to(
            target,
            ServerMessage::ValidationError {
                request,
                message: err.to_string(),
            },
        );
    }

    fn announce_departure(&self, departure: &Departure) {
        tracing::info!(
            identity = %departure.identity,
            room = %departure.room,
            remaining = departure.remaining.len(),
            "Member left"
        );
        self.broadcast(
            &departure.remaining,
            &ServerMessage::MemberLeft {
                identity: departure.identity.clone(),
                display_name: departure.display_name.clone(),
            },
        );
        self.broadcast(
            &departure.remaining,
            &ServerMessage::ChatMessage(ChatMessage::system(format!(
                "{} has left the room",
                departure.display_name
            ))),
        );
    }
}

/// Shared handle to the relay state. Cheap to clone.
#[derive(Clone)]
pub struct SignalingRelay {
    state: Arc<Mutex<RelayState>>,
}

impl SignalingRelay {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState {
                registry: PresenceRegistry::new(limits),
                connections: HashMap::new(),
            })),
        }
    }

    /// Register a new transport session and greet it with its identity.
    pub async fn connect(&self, tx: Outbound) -> ConnectionId {
        let identity = ConnectionId::new();
        let mut state = self.state.lock().await;
        state.connections.insert(identity.clone(), tx);
        state.send_to(
            &identity,
            ServerMessage::Welcome {
                identity: identity.clone(),
            },
        );
        tracing::debug!(identity = %identity, connections = state.connections.len(), "Connection registered");
        identity
    }

    /// Tear down a transport session. Runs the same cleanup as an explicit
    /// leave, then forgets the connection.
    pub async fn disconnect(&self, identity: &ConnectionId) {
        let mut state = self.state.lock().await;
        if let Some(departure) = state.registry.leave(identity) {
            state.announce_departure(&departure);
        }
        state.connections.remove(identity);
    }

    /// Handle one message from `from`.
    pub async fn handle(&self, from: &ConnectionId, msg: ClientMessage) {
        let mut state = self.state.lock().await;
        match msg {
            ClientMessage::JoinRoom { room, display_name } => {
                let membership = match state.registry.join(from, &room, &display_name) {
                    Ok(m) => m,
                    Err(e) => return state.reject(from, RequestKind::JoinRoom, e),
                };
                if let Some(previous) = &membership.previous {
                    state.announce_departure(previous);
                }

                tracing::info!(
                    identity = %from,
                    room = %membership.room,
                    name = %membership.display_name,
                    "Member joined"
                );

                let others: Vec<ConnectionId> =
                    membership.others.iter().map(|m| m.identity.clone()).collect();
                state.broadcast(
                    &others,
                    &ServerMessage::MemberJoined {
                        identity: from.clone(),
                        display_name: membership.display_name.clone(),
                    },
                );
                state.send_to(
                    from,
                    ServerMessage::RoomUsers {
                        members: membership.others,
                    },
                );
                let everyone = state.registry.room_members(&membership.room);
                state.broadcast(
                    &everyone,
                    &ServerMessage::ChatMessage(ChatMessage::system(format!(
                        "{} has joined the room",
                        membership.display_name
                    ))),
                );
            }

            ClientMessage::LeaveRoom => {
                if let Some(departure) = state.registry.leave(from) {
                    state.announce_departure(&departure);
                }
            }

            ClientMessage::SendChat { room, body } => match state.registry.send(from, &room, &body) {
                Ok(Some(delivery)) => {
                    state.broadcast(
                        &delivery.recipients,
                        &ServerMessage::ChatMessage(delivery.message),
                    );
                }
                Ok(None) => {}
                Err(e) => state.reject(from, RequestKind::SendChat, e),
            },

            ClientMessage::ToggleMute { muted } => {
                if let Some(change) = state.registry.set_muted(from, muted) {
                    tracing::debug!(identity = %from, room = %change.room, muted, "Mute changed");
                    state.broadcast(
                        &change.others,
                        &ServerMessage::MemberMuted {
                            identity: from.clone(),
                            muted,
                        },
                    );
                }
            }

            ClientMessage::NegotiationOffer {
                target,
                negotiation,
                offer,
            } => {
                let Some(sender) = state.registry.participant(from) else {
                    tracing::debug!(identity = %from, "Offer from identity without a room, dropped");
                    return;
                };
                let relayed = ServerMessage::NegotiationOffer {
                    from: from.clone(),
                    from_name: sender.display_name.clone(),
                    negotiation,
                    offer,
                };
                state.send_to(&target, relayed);
            }

            ClientMessage::NegotiationAnswer {
                target,
                negotiation,
                answer,
            } => {
                state.send_to(
                    &target,
                    ServerMessage::NegotiationAnswer {
                        from: from.clone(),
                        negotiation,
                        answer,
                    },
                );
            }

            ClientMessage::NegotiationCandidate {
                target,
                negotiation,
                candidate,
            } => {
                state.send_to(
                    &target,
                    ServerMessage::NegotiationCandidate {
                        from: from.clone(),
                        negotiation,
                        candidate,
                    },
                );
            }
        }
    }

    /// Forget all rooms and participants. Live connections stay registered.
    pub async fn reset(&self) {
        self.state.lock().await.registry.reset();
    }

    pub async fn room_members(&self, room: &str) -> Vec<ConnectionId> {
        self.state.lock().await.registry.room_members(room)
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    pub async fn room_count(&self) -> usize {
        self.state.lock().await.registry.room_count()
    }
}
