use serde::{Deserialize, Serialize};

/// Length limits for user-supplied text, in characters after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_display_name_len: usize,
    pub max_room_len: usize,
    pub max_chat_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_display_name_len: 50,
            max_room_len: 50,
            max_chat_len: 1000,
        }
    }
}
