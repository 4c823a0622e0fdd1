//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod client;
mod limits;
mod logging;
mod server;

pub use client::*;
pub use limits::*;
pub use logging::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root configuration shared by the relay and clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TavernConfig {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
    pub client: ClientConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server() {
        let config = TavernConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn default_limits_match_protocol() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.max_display_name_len, 50);
        assert_eq!(limits.max_room_len, 50);
        assert_eq!(limits.max_chat_len, 1000);
    }

    #[test]
    fn default_client() {
        let client = ClientConfig::default();
        assert_eq!(client.server_url, "ws://127.0.0.1:3001");
        assert_eq!(client.connect_timeout_secs, 10);
        assert_eq!(client.chat_history, 500);
        assert_eq!(client.ice_servers.len(), 2);
        assert!(client.ice_servers[0].urls[0].starts_with("stun:"));
    }

    #[test]
    fn default_logging() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, LogLevel::Info);
        assert_eq!(logging.level.as_str(), "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: TavernConfig = toml::from_str(
            r#"
[limits]
max_chat_len = 2000
"#,
        )
        .unwrap();
        assert_eq!(config.limits.max_chat_len, 2000);
        assert_eq!(config.limits.max_room_len, 50);
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn ice_servers_from_toml() {
        let config: TavernConfig = toml::from_str(
            r#"
[[client.ice_servers]]
urls = ["turn:turn.example.org:3478"]
username = "guest"
credential = "secret"
"#,
        )
        .unwrap();
        assert_eq!(config.client.ice_servers.len(), 1);
        let server = &config.client.ice_servers[0];
        assert_eq!(server.username.as_deref(), Some("guest"));
        assert_eq!(server.credential.as_deref(), Some("secret"));
    }

    #[test]
    fn log_level_parses_lowercase() {
        let config: TavernConfig = toml::from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
    }
}
