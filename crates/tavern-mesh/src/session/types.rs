use tavern_common::{ConnectionId, IceCandidate, NegotiationId, Result, SessionDescription};
use tracing::warn;

use crate::media::RemoteStream;
use crate::transport::PeerLink;

/// Which side sent the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// `Absent` is reported for identities with no live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Negotiating(Role),
    Connected,
    Closed,
}

/// Local record of one link to one remote identity.
pub struct PeerSession {
    pub remote: ConnectionId,
    pub role: Role,
    /// Distinguishes this session from earlier ones for the same remote.
    pub generation: u64,
    /// Offer/answer exchange this session belongs to. Remote answers and
    /// candidates tagged with any other id are stale.
    pub negotiation: NegotiationId,
    pub state: SessionState,
    pub(crate) link: Box<dyn PeerLink>,
    pub(crate) local_description: Option<SessionDescription>,
    pub(crate) remote_description: Option<SessionDescription>,
    /// Remote candidates received before the remote description.
    pub(crate) pending_candidates: Vec<IceCandidate>,
    pub(crate) inbound: Option<RemoteStream>,
}

impl PeerSession {
    pub(crate) fn new(
        remote: ConnectionId,
        role: Role,
        generation: u64,
        negotiation: NegotiationId,
        link: Box<dyn PeerLink>,
    ) -> Self {
        Self {
            remote,
            role,
            generation,
            negotiation,
            state: SessionState::Negotiating(role),
            link,
            local_description: None,
            remote_description: None,
            pending_candidates: Vec::new(),
            inbound: None,
        }
    }

    /// An initiator whose offer has not been answered yet.
    pub fn awaiting_answer(&self) -> bool {
        self.role == Role::Initiator && self.remote_description.is_none()
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_description.is_some()
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn inbound(&self) -> Option<&RemoteStream> {
        self.inbound.as_ref()
    }

    /// Apply the remote description, then flush buffered candidates.
    ///
    /// The buffer is taken, so each candidate is handed to the link at most
    /// once. Returns how many were applied.
    pub(crate) async fn apply_remote(&mut self, desc: SessionDescription) -> Result<usize> {
        self.link.set_remote_description(&desc).await?;
        self.remote_description = Some(desc);

        let pending = std::mem::take(&mut self.pending_candidates);
        let mut applied = 0;
        for candidate in &pending {
            match self.link.add_candidate(candidate).await {
                Ok(()) => applied += 1,
                Err(e) => warn!(remote = %self.remote, error = %e, "Failed to apply buffered candidate"),
            }
        }
        Ok(applied)
    }
}
