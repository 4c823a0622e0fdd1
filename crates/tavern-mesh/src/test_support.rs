//! Recording doubles for the transport, signaling and media seams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tavern_common::{
    ClientMessage, ConnectionId, IceCandidate, NegotiationId, Result, SessionDescription,
    TavernError,
};

use crate::media::{LocalStream, MediaSource, MediaTrack};
use crate::signaling::SignalingSink;
use crate::transport::{
    LinkEvent, LinkEventKind, LinkEventSender, LinkRequest, MediaTransport, PeerLink,
};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

struct LinkLog {
    remote: ConnectionId,
    generation: u64,
    tracks: Vec<MediaTrack>,
    local: Option<SessionDescription>,
    remote_desc: Option<SessionDescription>,
    candidates: Vec<IceCandidate>,
    closed: bool,
    events: LinkEventSender,
}

/// Test-side view of one opened link.
#[derive(Clone)]
pub struct LinkHandle(Arc<Mutex<LinkLog>>);

impl LinkHandle {
    pub fn generation(&self) -> u64 {
        self.0.lock().unwrap().generation
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.0.lock().unwrap().candidates.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.0.lock().unwrap().remote_desc.clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.0.lock().unwrap().local.clone()
    }

    pub fn tracks(&self) -> Vec<MediaTrack> {
        self.0.lock().unwrap().tracks.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.0.lock().unwrap().closed
    }

    /// Fire a transport event as this link would.
    pub fn emit(&self, kind: LinkEventKind) {
        let log = self.0.lock().unwrap();
        let _ = log.events.send(LinkEvent {
            remote: log.remote.clone(),
            generation: log.generation,
            kind,
        });
    }
}

#[derive(Default)]
struct TransportState {
    links: Vec<LinkHandle>,
    fail_open: bool,
    fail_offer: bool,
    fail_answer: bool,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    pub fn fail_offers(&self, fail: bool) {
        self.state.lock().unwrap().fail_offer = fail;
    }

    pub fn fail_answers(&self, fail: bool) {
        self.state.lock().unwrap().fail_answer = fail;
    }

    /// Every link opened towards `remote`, oldest first.
    pub fn links(&self, remote: &ConnectionId) -> Vec<LinkHandle> {
        self.state
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|l| l.0.lock().unwrap().remote == *remote)
            .cloned()
            .collect()
    }

    pub fn latest(&self, remote: &ConnectionId) -> LinkHandle {
        self.links(remote)
            .pop()
            .unwrap_or_else(|| panic!("no link opened to {remote}"))
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().links.len()
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn open_link(&self, request: LinkRequest) -> Result<Box<dyn PeerLink>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(TavernError::Negotiation("transport unavailable".into()));
        }
        let handle = LinkHandle(Arc::new(Mutex::new(LinkLog {
            remote: request.remote,
            generation: request.generation,
            tracks: request.tracks,
            local: None,
            remote_desc: None,
            candidates: Vec::new(),
            closed: false,
            events: request.events,
        })));
        state.links.push(handle.clone());
        Ok(Box::new(MockLink {
            handle,
            fail_offer: state.fail_offer,
            fail_answer: state.fail_answer,
        }))
    }
}

struct MockLink {
    handle: LinkHandle,
    fail_offer: bool,
    fail_answer: bool,
}

impl MockLink {
    fn describe(&self, kind: &str) -> String {
        let log = self.handle.0.lock().unwrap();
        format!("{kind}-{}-{}", log.remote, log.generation)
    }
}

#[async_trait]
impl PeerLink for MockLink {
    async fn create_offer(&mut self) -> Result<SessionDescription> {
        if self.fail_offer {
            return Err(TavernError::Negotiation("offer rejected".into()));
        }
        Ok(SessionDescription::offer(self.describe("offer")))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription> {
        if self.fail_answer {
            return Err(TavernError::Negotiation("answer rejected".into()));
        }
        Ok(SessionDescription::answer(self.describe("answer")))
    }

    async fn set_local_description(&mut self, desc: &SessionDescription) -> Result<()> {
        self.handle.0.lock().unwrap().local = Some(desc.clone());
        Ok(())
    }

    async fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<()> {
        self.handle.0.lock().unwrap().remote_desc = Some(desc.clone());
        Ok(())
    }

    async fn add_candidate(&mut self, candidate: &IceCandidate) -> Result<()> {
        let mut log = self.handle.0.lock().unwrap();
        if log.remote_desc.is_none() {
            return Err(TavernError::Negotiation(
                "candidate before remote description".into(),
            ));
        }
        log.candidates.push(candidate.clone());
        Ok(())
    }

    async fn replace_tracks(&mut self, tracks: &[MediaTrack]) -> Result<()> {
        self.handle.0.lock().unwrap().tracks = tracks.to_vec();
        Ok(())
    }

    async fn close(&mut self) {
        self.handle.0.lock().unwrap().closed = true;
    }
}

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

/// Signaling sink that captures every outgoing message.
#[derive(Clone, Default)]
pub struct MockSignaling {
    sent: Arc<Mutex<Vec<ClientMessage>>>,
}

impl MockSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Return and forget everything sent so far.
    pub fn take(&self) -> Vec<ClientMessage> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn offers_to(&self, remote: &ConnectionId) -> Vec<SessionDescription> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::NegotiationOffer { target, offer, .. } if target == *remote => {
                    Some(offer)
                }
                _ => None,
            })
            .collect()
    }

    /// Negotiation ids of the offers sent to `remote`, oldest first.
    pub fn offer_ids_to(&self, remote: &ConnectionId) -> Vec<NegotiationId> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::NegotiationOffer {
                    target,
                    negotiation,
                    ..
                } if target == *remote => Some(negotiation),
                _ => None,
            })
            .collect()
    }

    pub fn answers_to(&self, remote: &ConnectionId) -> Vec<SessionDescription> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::NegotiationAnswer { target, answer, .. } if target == *remote => {
                    Some(answer)
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SignalingSink for MockSignaling {
    async fn send(&self, msg: ClientMessage) -> Result<()> {
        tracing::debug!(?msg, "[MockSignaling] send");
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockMediaSource {
    deny: AtomicBool,
}

impl MockMediaSource {
    pub fn denying() -> Self {
        Self {
            deny: AtomicBool::new(true),
        }
    }

    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn acquire_audio(&self) -> Result<LocalStream> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(TavernError::Media("microphone permission denied".into()));
        }
        Ok(LocalStream::audio())
    }
}
