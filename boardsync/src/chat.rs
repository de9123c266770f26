//! Team chat feed state.
//!
//! The chat feed is a structurally simpler instance of the board's push
//! pattern: one append-only list per viewed team, replaced wholesale on
//! fetch and appended to on `chat:new-message` pushes. Appends are
//! idempotent by message id, for the same rebroadcast-race reason the
//! task store's upsert is.

use boardsync_proto::chat::ChatMessage;

/// Ordered message list for the currently viewed team.
#[derive(Debug, Default)]
pub struct ChatFeed {
    messages: Vec<ChatMessage>,
}

impl ChatFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the feed wholesale after a fetch, preserving server order.
    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// Appends a message unless one with the same id is already present.
    ///
    /// Returns whether the feed changed.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// The messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages in the feed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
