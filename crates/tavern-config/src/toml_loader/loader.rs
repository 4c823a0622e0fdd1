//! Core TOML config loading: resolve the file, read it, create it if absent.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tavern_common::ConfigError;
use tracing::{info, warn};

use super::template::default_config_toml;
use crate::schema::TavernConfig;
use crate::validation;

/// Names a config file to use instead of the platform default.
pub const CONFIG_PATH_ENV: &str = "TAVERN_CONFIG";

/// Load config from a specific TOML file path.
///
/// Missing fields take serde defaults. A file that parses but fails
/// validation is replaced wholesale by the defaults, with a warning naming
/// every offending value.
pub fn load_from_path(path: &Path) -> Result<TavernConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: TavernConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "{e}; falling back to default config");
        return Ok(TavernConfig::default());
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from [`default_config_path`].
///
/// If the file does not exist, writes a commented default file and returns
/// defaults.
pub fn load_default() -> Result<TavernConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            if let Err(e) = create_default_config(&path) {
                warn!("{e}");
            }
            Ok(TavernConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Where the config lives: `$TAVERN_CONFIG` when set and non-empty,
/// otherwise `<config dir>/tavern/config.toml`
/// (`~/.config` on Linux, `~/Library/Application Support` on macOS).
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
}

pub(crate) fn resolve_config_path(
    env_override: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = env_override.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let config_dir = config_dir.ok_or_else(|| {
        ConfigError::ParseError(format!(
            "could not determine config directory; set {CONFIG_PATH_ENV}"
        ))
    })?;
    Ok(config_dir.join("tavern").join("config.toml"))
}

/// Write the commented default config to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}
