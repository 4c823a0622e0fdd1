//! Default TOML config template with inline documentation comments.

pub(crate) fn default_config_toml() -> String {
    r##"# Tavern Configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# port = 3001

[limits]
# max_display_name_len = 50   # 1-200
# max_room_len = 50           # 1-200
# max_chat_len = 1000         # 1-10000

[logging]
# level = "info"              # trace, debug, info, warn, error

[client]
# server_url = "ws://127.0.0.1:3001"
# connect_timeout_secs = 10   # 1-120
# chat_history = 500          # 10-10000

# [[client.ice_servers]]
# urls = ["stun:stun.l.google.com:19302"]
#
# [[client.ice_servers]]
# urls = ["turn:turn.example.org:3478"]
# username = "guest"
# credential = "secret"
"##
    .to_string()
}
