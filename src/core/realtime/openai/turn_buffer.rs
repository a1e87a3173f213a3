//! Inbound audio accumulation and turn gating.
//!
//! Converted caller chunks pile up here until there are enough of them to
//! make a turn. While a response is outstanding nothing is released, so the
//! model never has two responses in flight for one session.

use std::mem;

/// Ordered chunk buffer plus the awaiting-response guard.
#[derive(Debug, Clone)]
pub struct TurnBuffer {
    chunks: Vec<String>,
    threshold: usize,
    awaiting_response: bool,
}

impl TurnBuffer {
    /// Create an empty buffer. A threshold of zero is treated as one.
    pub fn new(threshold: usize) -> Self {
        Self {
            chunks: Vec::new(),
            threshold: threshold.max(1),
            awaiting_response: false,
        }
    }

    /// Append a converted chunk, preserving arrival order.
    pub fn append(&mut self, chunk: String) {
        self.chunks.push(chunk);
    }

    /// True when a turn should be submitted now.
    pub fn should_flush(&self) -> bool {
        self.chunks.len() >= self.threshold && !self.awaiting_response
    }

    /// Take every buffered chunk for submission. Returns nothing while a
    /// response is outstanding.
    pub fn flush(&mut self) -> Vec<String> {
        if self.awaiting_response {
            return Vec::new();
        }
        mem::take(&mut self.chunks)
    }

    /// Mark whether a response is outstanding.
    pub fn set_awaiting(&mut self, awaiting: bool) {
        self.awaiting_response = awaiting;
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting_response
    }

    /// Clear the guard after a response finished. Returns true when chunks
    /// accumulated in the meantime and should go out as the next turn.
    pub fn complete_response(&mut self) -> bool {
        self.awaiting_response = false;
        !self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
