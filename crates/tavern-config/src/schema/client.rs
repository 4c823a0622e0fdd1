use serde::{Deserialize, Serialize};

/// A STUN/TURN server handed to the media transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: None,
            credential: None,
        }
    }
}

/// Client-side settings: relay address and media path discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the relay.
    pub server_url: String,
    pub connect_timeout_secs: u64,
    /// Chat lines kept in the local view buffer.
    pub chat_history: usize,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3001".into(),
            connect_timeout_secs: 10,
            chat_history: 500,
            ice_servers: vec![
                IceServerConfig::stun("stun:stun.l.google.com:19302"),
                IceServerConfig::stun("stun:stun1.l.google.com:19302"),
            ],
        }
    }
}
