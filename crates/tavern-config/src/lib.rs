//! Tavern configuration system.
//!
//! One TOML file configures both the relay and clients. Every section uses
//! serde defaults, so a partial file (or none at all) works out of the box.
//!
//! ```rust,no_run
//! let config = tavern_config::load_config().expect("failed to load config");
//! println!("relay listens on {}:{}", config.server.host, config.server.port);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ClientConfig, IceServerConfig, LimitsConfig, LogLevel, LoggingConfig, ServerConfig,
    TavernConfig,
};

use std::path::Path;

use tavern_common::ConfigError;

/// Load config from `$TAVERN_CONFIG` or the platform default path, creating it if missing.
pub fn load_config() -> Result<TavernConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path, or the default path when `None`.
pub fn load_config_from(path: Option<&Path>) -> Result<TavernConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => load_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[server]\nport = 4100\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.server.port, 4100);
    }
}
