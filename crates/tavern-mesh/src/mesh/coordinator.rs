//! Mesh coordinator state and event handling.

use std::collections::VecDeque;
use std::sync::Arc;

use tavern_common::{
    ClientMessage, ConnectionId, MemberInfo, RequestKind, Result, ServerMessage, TavernError,
};
use tavern_config::ClientConfig;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::ChatLog;
use crate::media::{LocalStream, MediaSource};
use crate::session::PeerSessionManager;
use crate::signaling::{SignalingEvent, SignalingSink};
use crate::transport::{LinkEvent, MediaTransport};

use super::types::{MeshCommand, MeshEvent};

/// Client-side view of one room and its call.
///
/// Owns the peer sessions, so every reaction runs on one task and two
/// events for the same remote are never handled at once. Initiator rule:
/// members already in the call offer to a newcomer; the newcomer waits.
pub struct MeshCoordinator {
    self_id: Option<ConnectionId>,
    room: Option<String>,
    /// Joins the relay has not answered yet, oldest first. The relay answers
    /// each with `room-users` or a join `validation-error`, in order. `None`
    /// marks a join abandoned by a later leave.
    pending_joins: VecDeque<Option<String>>,
    members: Vec<MemberInfo>,
    in_call: bool,
    muted: bool,
    local_stream: Option<LocalStream>,
    sessions: PeerSessionManager,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    media: Arc<dyn MediaSource>,
    signaling: Arc<dyn SignalingSink>,
    chat: ChatLog,
    event_tx: mpsc::UnboundedSender<MeshEvent>,
}

impl MeshCoordinator {
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn MediaTransport>,
        media: Arc<dyn MediaSource>,
        signaling: Arc<dyn SignalingSink>,
    ) -> (Self, mpsc::UnboundedReceiver<MeshEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (sessions, link_rx) = PeerSessionManager::new(
            transport,
            Arc::clone(&signaling),
            config.ice_servers.clone(),
        );
        let coordinator = Self {
            self_id: None,
            room: None,
            pending_joins: VecDeque::new(),
            members: Vec::new(),
            in_call: false,
            muted: false,
            local_stream: None,
            sessions,
            link_rx,
            media,
            signaling,
            chat: ChatLog::new(config.chat_history),
            event_tx,
        };
        (coordinator, event_rx)
    }

    /// Drive the coordinator until the relay disconnects or a
    /// [`MeshCommand::Shutdown`] arrives.
    pub async fn run(
        mut self,
        mut signaling_rx: mpsc::UnboundedReceiver<SignalingEvent>,
        mut commands: mpsc::UnboundedReceiver<MeshCommand>,
    ) {
        loop {
            tokio::select! {
                event = signaling_rx.recv() => match event {
                    Some(SignalingEvent::Message(msg)) => {
                        if let Err(e) = self.handle_server_message(msg).await {
                            warn!(error = %e, "Failed to handle relay message");
                        }
                    }
                    Some(SignalingEvent::Disconnected) | None => {
                        self.handle_disconnect().await;
                        break;
                    }
                },

                Some(event) = self.link_rx.recv() => {
                    if let Err(e) = self.handle_link_event(event).await {
                        warn!(error = %e, "Failed to handle link event");
                    }
                }

                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    if matches!(cmd, MeshCommand::Shutdown) {
                        self.leave_call().await;
                        break;
                    }
                    if let Err(e) = self.apply(cmd).await {
                        warn!(error = %e, "Command failed");
                    }
                }
            }
        }
        debug!("Mesh coordinator stopped");
    }

    async fn apply(&mut self, cmd: MeshCommand) -> Result<()> {
        match cmd {
            MeshCommand::JoinRoom { room, display_name } => {
                self.join_room(&room, &display_name).await
            }
            MeshCommand::LeaveRoom => self.leave_room().await,
            MeshCommand::JoinCall => self.join_call().await,
            MeshCommand::LeaveCall => {
                self.leave_call().await;
                Ok(())
            }
            MeshCommand::ToggleMute => self.toggle_mute().await.map(|_| ()),
            MeshCommand::SendChat { body } => self.send_chat(&body).await,
            MeshCommand::ReplaceStream(stream) => {
                self.replace_stream(stream).await;
                Ok(())
            }
            MeshCommand::Shutdown => Ok(()),
        }
    }

    // -- relay messages ---------------------------------------------------

    pub async fn handle_server_message(&mut self, msg: ServerMessage) -> Result<()> {
        match msg {
            ServerMessage::Welcome { identity } => {
                info!(identity = %identity, "Connected to relay");
                self.sessions.set_local_identity(identity.clone());
                self.self_id = Some(identity.clone());
                self.emit(MeshEvent::Connected { identity });
            }

            ServerMessage::RoomUsers { members } => {
                match self.pending_joins.pop_front() {
                    Some(Some(room)) => self.room = Some(room),
                    Some(None) => {
                        debug!("Listing for an abandoned join, ignored");
                        return Ok(());
                    }
                    None => {}
                }
                // Newcomer side of the initiator rule: wait for offers.
                self.members = members
                    .into_iter()
                    .filter(|m| !self.is_self(&m.identity))
                    .collect();
                self.emit_members();
            }

            ServerMessage::MemberJoined {
                identity,
                display_name,
            } => {
                if self.is_self(&identity) {
                    return Ok(());
                }
                self.upsert_member(MemberInfo {
                    identity: identity.clone(),
                    display_name,
                    muted: false,
                });
                self.emit_members();
                if self.in_call {
                    self.sessions.create_offer(&identity).await?;
                }
            }

            ServerMessage::MemberLeft { identity, .. } => {
                self.members.retain(|m| m.identity != identity);
                if self.sessions.close(&identity).await {
                    self.emit(MeshEvent::RemoteStreamRemoved {
                        identity: identity.clone(),
                    });
                }
                self.emit_members();
            }

            ServerMessage::MemberMuted { identity, muted } => {
                if let Some(member) = self.members.iter_mut().find(|m| m.identity == identity) {
                    member.muted = muted;
                }
                self.emit(MeshEvent::MemberMuted { identity, muted });
            }

            ServerMessage::ChatMessage(chat) => {
                self.chat.push(chat.clone());
                self.emit(MeshEvent::Chat(chat));
            }

            ServerMessage::NegotiationOffer {
                from,
                from_name,
                negotiation,
                offer,
            } => {
                if !self.members.iter().any(|m| m.identity == from) {
                    self.upsert_member(MemberInfo {
                        identity: from.clone(),
                        display_name: from_name,
                        muted: false,
                    });
                    self.emit_members();
                }
                self.sessions.handle_offer(&from, negotiation, offer).await?;
            }

            ServerMessage::NegotiationAnswer {
                from,
                negotiation,
                answer,
            } => {
                self.sessions
                    .handle_answer(&from, &negotiation, answer)
                    .await?;
            }

            ServerMessage::NegotiationCandidate {
                from,
                negotiation,
                candidate,
            } => {
                self.sessions
                    .handle_remote_candidate(&from, &negotiation, candidate)
                    .await?;
            }

            ServerMessage::ValidationError { request, message } => {
                if request == RequestKind::JoinRoom {
                    self.pending_joins.pop_front();
                }
                self.emit(MeshEvent::ValidationError(message));
            }
        }
        Ok(())
    }

    pub async fn handle_link_event(&mut self, event: LinkEvent) -> Result<()> {
        if let Some(stream) = self.sessions.handle_link_event(event).await? {
            self.emit(MeshEvent::RemoteStreamAttached(stream));
        }
        Ok(())
    }

    async fn handle_disconnect(&mut self) {
        info!("Relay connection lost");
        self.leave_call().await;
        self.room = None;
        self.pending_joins.clear();
        self.members.clear();
        self.emit(MeshEvent::Disconnected);
    }

    // -- local actions ----------------------------------------------------

    /// Ask the relay to put us in `room`. Leaves any current call first.
    pub async fn join_room(&mut self, room: &str, display_name: &str) -> Result<()> {
        if self.in_call {
            self.leave_call().await;
        }
        let room = room.trim().to_string();
        if self.room.as_deref() != Some(room.as_str()) {
            self.chat.clear();
        }
        self.pending_joins.push_back(Some(room.clone()));
        self.signaling
            .send(ClientMessage::JoinRoom {
                room,
                display_name: display_name.trim().to_string(),
            })
            .await
    }

    pub async fn leave_room(&mut self) -> Result<()> {
        if self.room.is_none() && !self.pending_joins.iter().any(Option::is_some) {
            return Ok(());
        }
        self.leave_call().await;
        self.room = None;
        for join in self.pending_joins.iter_mut() {
            *join = None;
        }
        self.members.clear();
        self.chat.clear();
        self.emit_members();
        self.signaling.send(ClientMessage::LeaveRoom).await
    }

    /// Acquire local audio and offer to every known member.
    ///
    /// If audio cannot be acquired the user is told and the call is not
    /// entered.
    pub async fn join_call(&mut self) -> Result<()> {
        if self.in_call {
            return Ok(());
        }
        if self.room.is_none() {
            return Err(TavernError::Other("join a room before starting a call".into()));
        }

        let stream = match self.media.acquire_audio().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Could not acquire local audio");
                self.emit(MeshEvent::MediaUnavailable(e.to_string()));
                return Err(e);
            }
        };

        self.sessions.set_outbound(Some(stream.clone()));
        self.local_stream = Some(stream);
        self.in_call = true;
        self.emit(MeshEvent::CallStateChanged { in_call: true });

        let targets: Vec<ConnectionId> = self.members.iter().map(|m| m.identity.clone()).collect();
        info!(peers = targets.len(), "Joined call");
        for remote in targets {
            if let Err(e) = self.sessions.create_offer(&remote).await {
                warn!(remote = %remote, error = %e, "Offer failed");
            }
        }
        Ok(())
    }

    /// Close every session and release local audio. A muted user is
    /// unmuted so the next call starts audible.
    pub async fn leave_call(&mut self) {
        if !self.in_call {
            return;
        }
        for remote in self.sessions.close_all().await {
            self.emit(MeshEvent::RemoteStreamRemoved { identity: remote });
        }
        self.sessions.set_outbound(None);
        self.local_stream = None;
        self.in_call = false;

        if self.muted {
            self.muted = false;
            if let Err(e) = self
                .signaling
                .send(ClientMessage::ToggleMute { muted: false })
                .await
            {
                warn!(error = %e, "Failed to report unmute");
            }
            self.emit(MeshEvent::LocalMuteChanged(false));
        }

        self.emit(MeshEvent::CallStateChanged { in_call: false });
        info!("Left call");
    }

    /// Flip local mute. Only meaningful during a call; returns the new state.
    pub async fn toggle_mute(&mut self) -> Result<bool> {
        let Some(stream) = self.local_stream.as_mut() else {
            return Ok(self.muted);
        };
        self.muted = !self.muted;
        stream.set_enabled(!self.muted);
        let stream = stream.clone();

        self.sessions.replace_outbound(stream).await;
        self.emit(MeshEvent::LocalMuteChanged(self.muted));
        self.signaling
            .send(ClientMessage::ToggleMute { muted: self.muted })
            .await?;
        Ok(self.muted)
    }

    /// Send a chat line to the current room. Blank lines are not sent.
    pub async fn send_chat(&mut self, body: &str) -> Result<()> {
        let Some(room) = self.room.clone() else {
            debug!("Not in a room, chat not sent");
            return Ok(());
        };
        let body = body.trim();
        if body.is_empty() {
            return Ok(());
        }
        self.signaling
            .send(ClientMessage::SendChat {
                room,
                body: body.to_string(),
            })
            .await
    }

    /// Swap local audio, e.g. after a device change, without renegotiating.
    pub async fn replace_stream(&mut self, mut stream: LocalStream) {
        if !self.in_call {
            return;
        }
        stream.set_enabled(!self.muted);
        self.local_stream = Some(stream.clone());
        self.sessions.replace_outbound(stream).await;
    }

    // -- queries ----------------------------------------------------------

    pub fn identity(&self) -> Option<&ConnectionId> {
        self.self_id.as_ref()
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    pub fn in_call(&self) -> bool {
        self.in_call
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn sessions(&self) -> &PeerSessionManager {
        &self.sessions
    }

    // -- helpers ----------------------------------------------------------

    fn is_self(&self, identity: &ConnectionId) -> bool {
        self.self_id.as_ref() == Some(identity)
    }

    fn upsert_member(&mut self, member: MemberInfo) {
        match self.members.iter_mut().find(|m| m.identity == member.identity) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
    }

    fn emit(&self, event: MeshEvent) {
        let _ = self.event_tx.send(event);
    }

    fn emit_members(&self) {
        self.emit(MeshEvent::MembersChanged(self.members.clone()));
    }

    #[cfg(test)]
    pub(crate) async fn pump_link_events(&mut self) {
        while let Ok(event) = self.link_rx.try_recv() {
            self.handle_link_event(event).await.unwrap();
        }
    }
}
