// ABOUTME: Bounded conversation buffer with front-only trimming
// ABOUTME: Keeps tool-result turns paired with the assistant turn that requested them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! Ordered, bounded log of conversation turns.

use tracing::debug;

use crate::llm::Message;

/// Bounded conversation history for one chat session
///
/// Turns are appended at the tail; trimming removes only from the front and
/// runs only at turn boundaries (never between an assistant tool request
/// and its tool results). After trimming, any tool-result turn left at the
/// front is dropped too — the completion API rejects a window that opens
/// with results whose requesting turn is gone.
#[derive(Debug)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
    capacity: usize,
}

impl ConversationBuffer {
    /// Create an empty buffer with the given turn capacity
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            messages: Vec::new(),
            capacity,
        }
    }

    /// Append a turn at the tail
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop oldest turns until the buffer fits its capacity
    pub fn trim(&mut self) {
        if self.messages.len() > self.capacity {
            let removed = self.messages.len() - self.capacity;
            self.messages.drain(..removed);
            debug!(
                removed,
                size = self.messages.len(),
                "trimmed old messages from history"
            );
        }

        // An orphaned tool-result turn at the front would pair with an
        // assistant turn that was just dropped.
        while self
            .messages
            .first()
            .is_some_and(Message::is_tool_result_turn)
        {
            self.messages.remove(0);
        }
    }

    /// Snapshot of the buffer for building the next completion request
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Empty the buffer (explicit session reset)
    pub fn clear(&mut self) {
        self.messages.clear();
        debug!("conversation history cleared");
    }

    /// Number of turns currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::llm::ContentBlock;
    use serde_json::json;

    fn tool_request(i: usize) -> Message {
        Message::assistant_blocks(vec![ContentBlock::ToolUse {
            id: format!("toolu_{i}"),
            name: "geocode_location".into(),
            input: json!({}),
        }])
    }

    fn tool_result(i: usize) -> Message {
        Message::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: format!("toolu_{i}"),
            content: "{}".into(),
        }])
    }

    #[test]
    fn test_trim_keeps_most_recent_within_capacity() {
        let mut buffer = ConversationBuffer::new(4);
        for i in 0..10 {
            buffer.append(Message::user(format!("message {i}")));
        }
        buffer.trim();
        assert_eq!(buffer.len(), 4);
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot[0], Message::user("message 6"));
        assert_eq!(snapshot[3], Message::user("message 9"));
    }

    #[test]
    fn test_trim_is_noop_under_capacity() {
        let mut buffer = ConversationBuffer::new(20);
        buffer.append(Message::user("hola"));
        buffer.trim();
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_trim_drops_orphaned_tool_result_at_front() {
        let mut buffer = ConversationBuffer::new(3);
        buffer.append(Message::user("question"));
        buffer.append(tool_request(1));
        buffer.append(tool_result(1));
        buffer.append(Message::user("followup"));
        // Capacity 3 would slice to [tool_result, user] after dropping two
        // from the front, orphaning the result from its request.
        buffer.trim();
        let snapshot = buffer.snapshot();
        assert!(!snapshot
            .first()
            .is_some_and(Message::is_tool_result_turn));
        assert_eq!(snapshot.last(), Some(&Message::user("followup")));
    }

    #[test]
    fn test_paired_request_and_result_survive_together() {
        let mut buffer = ConversationBuffer::new(4);
        buffer.append(Message::user("old"));
        buffer.append(Message::user("question"));
        buffer.append(tool_request(1));
        buffer.append(tool_result(1));
        buffer.append(Message::user("next"));
        buffer.trim();
        let snapshot = buffer.snapshot();
        // The request/result pair sits inside the window, intact.
        let request_pos = snapshot.iter().position(|m| *m == tool_request(1)).unwrap();
        assert_eq!(snapshot[request_pos + 1], tool_result(1));
    }

    #[test]
    fn test_clear_empties_buffer() {
        let mut buffer = ConversationBuffer::new(4);
        buffer.append(Message::user("hola"));
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
