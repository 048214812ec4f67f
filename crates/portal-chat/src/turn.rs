//! The assistant reply under construction.
//!
//! `Pending → Streaming → {Finalized | Discarded}`; both end states are final
//! and every later transition is refused.

use crate::message::Message;

/// Appended after the partial text while a reply is still arriving
pub const STREAMING_MARKER: char = '▋';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Placeholder shown, nothing received yet
    Pending,
    /// At least one chunk received
    Streaming,
    Finalized,
    Discarded,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Discarded)
    }
}

#[derive(Debug, Clone)]
pub struct AssistantTurn {
    id: u64,
    time: String,
    buffer: String,
    state: TurnState,
}

impl AssistantTurn {
    pub fn new(id: u64, time: impl Into<String>) -> Self {
        Self {
            id,
            time: time.into(),
            buffer: String::new(),
            state: TurnState::Pending,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Placeholder creation time, kept by the committed message
    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn content(&self) -> &str {
        &self.buffer
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Append a chunk. Returns false once the turn has ended.
    pub fn push_chunk(&mut self, content: &str) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.buffer.push_str(content);
        self.state = TurnState::Streaming;
        true
    }

    /// Commit the accumulated text as an assistant message.
    pub fn finalize(&mut self) -> Option<Message> {
        if self.state.is_terminal() {
            return None;
        }
        self.state = TurnState::Finalized;
        Some(Message::assistant(self.buffer.clone(), self.time.clone()))
    }

    /// Drop the placeholder. Returns false once the turn has ended.
    pub fn discard(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = TurnState::Discarded;
        true
    }

    /// Visible text: the accumulated content, plus the marker while live.
    pub fn display_text(&self) -> String {
        if self.is_streaming() {
            format!("{}{}", self.buffer, STREAMING_MARKER)
        } else {
            self.buffer.clone()
        }
    }
}
