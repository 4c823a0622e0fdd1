//! Full configuration validation.
//!
//! Every check pushes onto a shared error list so a single
//! `ConfigError::ValidationError` reports all problems at once.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::TavernConfig;
use helpers::validate_range;
use tavern_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TavernConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_limits(&mut errors, config);
    validate_client(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &TavernConfig) {
    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
}

fn validate_limits(errors: &mut Vec<String>, config: &TavernConfig) {
    let l = &config.limits;
    validate_range(errors, "limits.max_display_name_len", l.max_display_name_len, 1, 200);
    validate_range(errors, "limits.max_room_len", l.max_room_len, 1, 200);
    validate_range(errors, "limits.max_chat_len", l.max_chat_len, 1, 10_000);
}

fn validate_client(errors: &mut Vec<String>, config: &TavernConfig) {
    let c = &config.client;

    if !(c.server_url.starts_with("ws://") || c.server_url.starts_with("wss://")) {
        errors.push(format!(
            "client.server_url must start with ws:// or wss://, got '{}'",
            c.server_url
        ));
    }

    validate_range(
        errors,
        "client.connect_timeout_secs",
        c.connect_timeout_secs as usize,
        1,
        120,
    );
    validate_range(errors, "client.chat_history", c.chat_history, 10, 10_000);

    for (i, server) in c.ice_servers.iter().enumerate() {
        if server.urls.is_empty() {
            errors.push(format!("client.ice_servers[{i}].urls must not be empty"));
        }
        for url in &server.urls {
            if !(url.starts_with("stun:") || url.starts_with("turn:") || url.starts_with("turns:"))
            {
                errors.push(format!(
                    "client.ice_servers[{i}] url '{url}' must use stun:, turn: or turns:"
                ));
            }
        }
    }
}
