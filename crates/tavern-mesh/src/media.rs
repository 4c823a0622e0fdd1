//! Local and remote media handles.
//!
//! Capture itself belongs to the host platform; the mesh only tracks which
//! tracks exist and whether they are enabled.

use async_trait::async_trait;
use tavern_common::{new_id, ConnectionId, Result};

/// One outbound audio track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub enabled: bool,
}

/// Locally captured audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl LocalStream {
    /// A stream with a single enabled audio track.
    pub fn audio() -> Self {
        Self {
            id: new_id(),
            tracks: vec![MediaTrack {
                id: new_id(),
                enabled: true,
            }],
        }
    }

    /// Enable or disable every track. Disabled tracks send silence.
    pub fn set_enabled(&mut self, enabled: bool) {
        for track in &mut self.tracks {
            track.enabled = enabled;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tracks.iter().any(|t| t.enabled)
    }
}

/// Media received from a remote participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub remote: ConnectionId,
}

/// Acquires local audio, e.g. by asking the user for microphone access.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire_audio(&self) -> Result<LocalStream>;
}
