//! Peer session manager: one negotiation per remote identity.
//!
//! The manager is owned by a single task and every operation takes
//! `&mut self`, so operations never interleave. Transport callbacks arrive
//! later as [`LinkEvent`]s on a channel; each carries the generation of the
//! session that produced it and is discarded if that session has since been
//! replaced. Remote answers and candidates are matched the same way, by the
//! negotiation id the offer introduced.

use std::collections::HashMap;
use std::sync::Arc;

use tavern_common::{
    ClientMessage, ConnectionId, IceCandidate, NegotiationId, Result, SessionDescription,
    TavernError,
};
use tavern_config::IceServerConfig;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::media::{LocalStream, RemoteStream};
use crate::signaling::SignalingSink;
use crate::transport::{
    LinkEvent, LinkEventKind, LinkEventSender, LinkRequest, LinkState, MediaTransport, PeerLink,
};

use super::types::{PeerSession, Role, SessionState};

// ---------------------------------------------------------------------------
// Peer Session Manager
// ---------------------------------------------------------------------------

pub struct PeerSessionManager {
    local: Option<ConnectionId>,
    transport: Arc<dyn MediaTransport>,
    signaling: Arc<dyn SignalingSink>,
    ice_servers: Vec<IceServerConfig>,
    outbound: Option<LocalStream>,
    sessions: HashMap<ConnectionId, PeerSession>,
    next_generation: u64,
    link_tx: LinkEventSender,
}

impl PeerSessionManager {
    /// Create a manager. The receiver yields transport events to feed back
    /// through [`handle_link_event`](Self::handle_link_event).
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        signaling: Arc<dyn SignalingSink>,
        ice_servers: Vec<IceServerConfig>,
    ) -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let mgr = Self {
            local: None,
            transport,
            signaling,
            ice_servers,
            outbound: None,
            sessions: HashMap::new(),
            next_generation: 1,
            link_tx,
        };
        (mgr, link_rx)
    }

    /// Our own identity, used to decide who restarts a failed link.
    pub fn set_local_identity(&mut self, identity: ConnectionId) {
        self.local = Some(identity);
    }

    /// Set the outbound stream without touching open sessions.
    pub fn set_outbound(&mut self, stream: Option<LocalStream>) {
        self.outbound = stream;
    }

    pub fn has_outbound(&self) -> bool {
        self.outbound.is_some()
    }

    /// Swap the outbound stream and re-attach its tracks to every open
    /// session. Sessions are kept; a link that rejects the new tracks is
    /// logged and left as is.
    pub async fn replace_outbound(&mut self, stream: LocalStream) {
        for session in self.sessions.values_mut() {
            if let Err(e) = session.link.replace_tracks(&stream.tracks).await {
                warn!(remote = %session.remote, error = %e, "Failed to replace tracks");
            }
        }
        self.outbound = Some(stream);
    }

    // -- negotiation ------------------------------------------------------

    /// Start a negotiation towards `remote` as initiator.
    ///
    /// Without outbound media this does nothing. Any existing session for
    /// `remote` is closed first. On failure the identity is left without a
    /// session.
    pub async fn create_offer(&mut self, remote: &ConnectionId) -> Result<()> {
        if self.outbound.is_none() {
            debug!(remote = %remote, "No outbound media yet, not offering");
            return Ok(());
        }

        self.close(remote).await;
        let generation = self
            .open_session(remote, Role::Initiator, NegotiationId::new())
            .await?;

        match self.offer_and_send(remote).await {
            Ok(()) => {
                debug!(remote = %remote, generation, "Offer sent");
                Ok(())
            }
            Err(e) => {
                warn!(remote = %remote, error = %e, "Offer failed, dropping session");
                self.close(remote).await;
                Err(e)
            }
        }
    }

    /// Answer an offer from `remote`, replacing any session we hold for it.
    ///
    /// Without outbound media this does nothing.
    pub async fn handle_offer(
        &mut self,
        remote: &ConnectionId,
        negotiation: NegotiationId,
        offer: SessionDescription,
    ) -> Result<()> {
        if self.outbound.is_none() {
            debug!(remote = %remote, "No outbound media yet, ignoring offer");
            return Ok(());
        }

        if self.sessions.get(remote).is_some_and(|s| s.awaiting_answer()) {
            debug!(remote = %remote, "Offer collision, yielding to remote offer");
        }

        self.close(remote).await;
        let generation = self
            .open_session(remote, Role::Responder, negotiation)
            .await?;

        match self.answer_and_send(remote, offer).await {
            Ok(()) => {
                debug!(remote = %remote, generation, "Answer sent");
                Ok(())
            }
            Err(e) => {
                warn!(remote = %remote, error = %e, "Answer failed, dropping session");
                self.close(remote).await;
                Err(e)
            }
        }
    }

    /// Apply `remote`'s answer to our pending offer. Answers for sessions
    /// that do not exist, belong to a replaced offer, or are not waiting for
    /// one are dropped.
    pub async fn handle_answer(
        &mut self,
        remote: &ConnectionId,
        negotiation: &NegotiationId,
        answer: SessionDescription,
    ) -> Result<()> {
        let Some(session) = self.sessions.get_mut(remote) else {
            debug!(remote = %remote, "Answer for unknown session, dropped");
            return Ok(());
        };
        if session.negotiation != *negotiation {
            debug!(remote = %remote, stale = %negotiation, "Answer for replaced offer, dropped");
            return Ok(());
        }
        if !session.awaiting_answer() {
            debug!(remote = %remote, "Unexpected answer, dropped");
            return Ok(());
        }

        match session.apply_remote(answer).await {
            Ok(flushed) => {
                debug!(remote = %remote, flushed, "Answer applied");
                Ok(())
            }
            Err(e) => {
                warn!(remote = %remote, error = %e, "Failed to apply answer, dropping session");
                self.close(remote).await;
                Err(e)
            }
        }
    }

    /// Apply a remote path candidate now, or buffer it until the remote
    /// description is set. Candidates for unknown or replaced sessions are
    /// dropped.
    pub async fn handle_remote_candidate(
        &mut self,
        remote: &ConnectionId,
        negotiation: &NegotiationId,
        candidate: IceCandidate,
    ) -> Result<()> {
        let Some(session) = self.sessions.get_mut(remote) else {
            debug!(remote = %remote, "Candidate for unknown session, dropped");
            return Ok(());
        };
        if session.negotiation != *negotiation {
            debug!(remote = %remote, stale = %negotiation, "Candidate for replaced session, dropped");
            return Ok(());
        }

        if session.has_remote_description() {
            if let Err(e) = session.link.add_candidate(&candidate).await {
                warn!(remote = %remote, error = %e, "Failed to apply candidate");
            }
        } else {
            session.pending_candidates.push(candidate);
            debug!(
                remote = %remote,
                pending = session.pending_candidates.len(),
                "Buffered candidate"
            );
        }
        Ok(())
    }

    /// React to a transport event. Returns the stream when inbound media was
    /// attached to a live session.
    pub async fn handle_link_event(&mut self, event: LinkEvent) -> Result<Option<RemoteStream>> {
        let remote = event.remote;
        let Some(session) = self.sessions.get_mut(&remote) else {
            debug!(remote = %remote, "Event for closed session, dropped");
            return Ok(None);
        };
        if session.generation != event.generation {
            debug!(
                remote = %remote,
                stale = event.generation,
                live = session.generation,
                "Stale link event, dropped"
            );
            return Ok(None);
        }

        match event.kind {
            LinkEventKind::CandidateGathered(candidate) => {
                self.signaling
                    .send(ClientMessage::NegotiationCandidate {
                        target: remote,
                        negotiation: session.negotiation.clone(),
                        candidate,
                    })
                    .await?;
                Ok(None)
            }
            LinkEventKind::InboundMedia(stream) => {
                session.inbound = Some(stream.clone());
                session.state = SessionState::Connected;
                info!(remote = %remote, "Remote audio attached");
                Ok(Some(stream))
            }
            LinkEventKind::StateChanged(LinkState::Connected) => {
                session.state = SessionState::Connected;
                Ok(None)
            }
            LinkEventKind::StateChanged(LinkState::Closed) => {
                session.state = SessionState::Closed;
                Ok(None)
            }
            LinkEventKind::StateChanged(LinkState::Failed) => {
                if self.owns_restart(&remote) {
                    info!(remote = %remote, "Link failed, restarting negotiation");
                    self.create_offer(&remote).await?;
                } else {
                    debug!(remote = %remote, "Link failed, waiting for remote to restart");
                }
                Ok(None)
            }
            LinkEventKind::StateChanged(state) => {
                debug!(remote = %remote, ?state, "Link state changed");
                Ok(None)
            }
        }
    }

    // -- teardown ---------------------------------------------------------

    /// Close the session for `remote`. Returns false if there was none.
    pub async fn close(&mut self, remote: &ConnectionId) -> bool {
        match self.sessions.remove(remote) {
            Some(mut session) => {
                session.link.close().await;
                debug!(remote = %remote, generation = session.generation, "Session closed");
                true
            }
            None => false,
        }
    }

    /// Close every session. Returns the identities that had one.
    pub async fn close_all(&mut self) -> Vec<ConnectionId> {
        let mut closed = Vec::with_capacity(self.sessions.len());
        for (remote, mut session) in self.sessions.drain() {
            session.link.close().await;
            closed.push(remote);
        }
        closed
    }

    // -- queries ----------------------------------------------------------

    pub fn state(&self, remote: &ConnectionId) -> SessionState {
        self.sessions
            .get(remote)
            .map(|s| s.state)
            .unwrap_or(SessionState::Absent)
    }

    pub fn session(&self, remote: &ConnectionId) -> Option<&PeerSession> {
        self.sessions.get(remote)
    }

    pub fn pending_candidates(&self, remote: &ConnectionId) -> usize {
        self.sessions
            .get(remote)
            .map(|s| s.pending_candidates.len())
            .unwrap_or(0)
    }

    pub fn remotes(&self) -> Vec<ConnectionId> {
        let mut remotes: Vec<_> = self.sessions.keys().cloned().collect();
        remotes.sort();
        remotes
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // -- internals --------------------------------------------------------

    async fn open_session(
        &mut self,
        remote: &ConnectionId,
        role: Role,
        negotiation: NegotiationId,
    ) -> Result<u64> {
        let tracks = self
            .outbound
            .as_ref()
            .map(|s| s.tracks.clone())
            .unwrap_or_default();
        let generation = self.next_generation;
        self.next_generation += 1;

        let link = self
            .transport
            .open_link(LinkRequest {
                remote: remote.clone(),
                generation,
                tracks,
                ice_servers: self.ice_servers.clone(),
                events: self.link_tx.clone(),
            })
            .await
            .map_err(|e| {
                warn!(remote = %remote, error = %e, "Failed to open link");
                e
            })?;

        self.sessions.insert(
            remote.clone(),
            PeerSession::new(remote.clone(), role, generation, negotiation, link),
        );
        Ok(generation)
    }

    async fn offer_and_send(&mut self, remote: &ConnectionId) -> Result<()> {
        let session = self.live_session(remote)?;
        let offer = produce_offer(session.link.as_mut()).await?;
        session.local_description = Some(offer.clone());
        let negotiation = session.negotiation.clone();

        self.signaling
            .send(ClientMessage::NegotiationOffer {
                target: remote.clone(),
                negotiation,
                offer,
            })
            .await
    }

    async fn answer_and_send(
        &mut self,
        remote: &ConnectionId,
        offer: SessionDescription,
    ) -> Result<()> {
        let session = self.live_session(remote)?;
        session.apply_remote(offer).await?;
        let answer = produce_answer(session.link.as_mut()).await?;
        session.local_description = Some(answer.clone());
        let negotiation = session.negotiation.clone();

        self.signaling
            .send(ClientMessage::NegotiationAnswer {
                target: remote.clone(),
                negotiation,
                answer,
            })
            .await
    }

    fn live_session(&mut self, remote: &ConnectionId) -> Result<&mut PeerSession> {
        self.sessions
            .get_mut(remote)
            .ok_or_else(|| TavernError::Negotiation(format!("no session for {remote}")))
    }

    /// Exactly one side of a pair restarts a failed link: the one with the
    /// smaller identity. Offers always replace, so restarts never collide.
    fn owns_restart(&self, remote: &ConnectionId) -> bool {
        self.local.as_ref().is_some_and(|local| local < remote)
    }
}

async fn produce_offer(link: &mut dyn PeerLink) -> Result<SessionDescription> {
    let offer = link.create_offer().await?;
    link.set_local_description(&offer).await?;
    Ok(offer)
}

async fn produce_answer(link: &mut dyn PeerLink) -> Result<SessionDescription> {
    let answer = link.create_answer().await?;
    link.set_local_description(&answer).await?;
    Ok(answer)
}
