//! Seam to the host's real-time media transport.
//!
//! A [`PeerLink`] is one direct connection attempt to one remote identity.
//! Codec negotiation and NAT traversal happen behind it; the mesh only
//! moves session descriptions and path candidates in and out.

use async_trait::async_trait;
use tavern_common::{ConnectionId, IceCandidate, Result, SessionDescription};
use tavern_config::IceServerConfig;
use tokio::sync::mpsc;

use crate::media::{MediaTrack, RemoteStream};

/// Connection state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkEventKind {
    /// A local path candidate to forward to the remote.
    CandidateGathered(IceCandidate),
    /// The remote's audio arrived.
    InboundMedia(RemoteStream),
    StateChanged(LinkState),
}

/// Unsolicited event from a link, tagged with the session generation that
/// opened it so events from replaced sessions can be recognised.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEvent {
    pub remote: ConnectionId,
    pub generation: u64,
    pub kind: LinkEventKind,
}

pub type LinkEventSender = mpsc::UnboundedSender<LinkEvent>;

/// Everything a transport needs to open a link.
pub struct LinkRequest {
    pub remote: ConnectionId,
    pub generation: u64,
    pub tracks: Vec<MediaTrack>,
    pub ice_servers: Vec<IceServerConfig>,
    pub events: LinkEventSender,
}

#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn open_link(&self, request: LinkRequest) -> Result<Box<dyn PeerLink>>;
}

#[async_trait]
pub trait PeerLink: Send {
    async fn create_offer(&mut self) -> Result<SessionDescription>;
    async fn create_answer(&mut self) -> Result<SessionDescription>;
    async fn set_local_description(&mut self, desc: &SessionDescription) -> Result<()>;
    async fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<()>;
    async fn add_candidate(&mut self, candidate: &IceCandidate) -> Result<()>;
    /// Swap the outbound tracks without renegotiating.
    async fn replace_tracks(&mut self, tracks: &[MediaTrack]) -> Result<()>;
    async fn close(&mut self);
}
