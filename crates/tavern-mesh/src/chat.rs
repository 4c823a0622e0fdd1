//! Local chat view buffer.
//!
//! Keeps the most recent lines of the current room in a bounded ring buffer
//! so memory stays predictable. Nothing is persisted.

use std::collections::VecDeque;

use tavern_common::ChatMessage;

pub struct ChatLog {
    capacity: usize,
    messages: VecDeque<ChatMessage>,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            messages: VecDeque::new(),
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&mut self, msg: ChatMessage) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(msg);
    }

    /// The most recent `limit` lines, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<&ChatMessage> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(skip).collect()
    }

    pub fn all(&self) -> Vec<&ChatMessage> {
        self.messages.iter().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new(500)
    }
}
