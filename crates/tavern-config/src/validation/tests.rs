use super::*;
use crate::schema::IceServerConfig;

#[test]
fn default_config_is_valid() {
    assert!(validate(&TavernConfig::default()).is_ok());
}

#[test]
fn zero_chat_limit_is_rejected() {
    let mut config = TavernConfig::default();
    config.limits.max_chat_len = 0;
    let err = validate(&config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "config validation error: limits.max_chat_len = 0 is out of range [1, 10000]"
    );
}

#[test]
fn all_errors_are_collected() {
    let mut config = TavernConfig::default();
    config.limits.max_room_len = 0;
    config.limits.max_display_name_len = 500;
    config.client.server_url = "http://localhost:3001".into();

    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("limits.max_room_len"));
    assert!(err.contains("limits.max_display_name_len"));
    assert!(err.contains("client.server_url"));
    assert_eq!(err.matches("; ").count(), 2);
}

#[test]
fn empty_host_is_rejected() {
    let mut config = TavernConfig::default();
    config.server.host = "  ".into();
    assert!(validate(&config).is_err());
}

#[test]
fn wss_url_is_accepted() {
    let mut config = TavernConfig::default();
    config.client.server_url = "wss://tavern.example.org".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn ice_server_scheme_is_checked() {
    let mut config = TavernConfig::default();
    config.client.ice_servers.push(IceServerConfig::stun("https://stun.example.org"));
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("client.ice_servers[2]"));
}

#[test]
fn ice_server_without_urls_is_rejected() {
    let mut config = TavernConfig::default();
    config.client.ice_servers = vec![IceServerConfig {
        urls: vec![],
        username: None,
        credential: None,
    }];
    assert!(validate(&config).is_err());
}

#[test]
fn empty_ice_server_list_is_allowed() {
    let mut config = TavernConfig::default();
    config.client.ice_servers.clear();
    assert!(validate(&config).is_ok());
}
