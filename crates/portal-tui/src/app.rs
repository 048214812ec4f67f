use portal_chat::{clock_time, AssistantTurn, Message, MessageRole};
use std::time::{Duration, Instant};

/// How long a toast stays on screen
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    System,
}

/// One row of the message list
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: EntryKind,
    pub content: String,
    pub time: String,
    /// Set while the row is the placeholder of a live turn
    pub turn_id: Option<u64>,
}

impl Entry {
    pub fn is_streaming(&self) -> bool {
        self.turn_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Connecting,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "● 已连接"),
            ConnectionStatus::Disconnected => write!(f, "○ 未连接"),
            ConnectionStatus::Connecting => write!(f, "◐ 连接中"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    shown_at: Instant,
}

impl Toast {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= TOAST_DURATION
    }
}

/// Everything the PC surface draws
#[derive(Debug)]
pub struct Screen {
    pub entries: Vec<Entry>,
    pub input: String,
    pub status: ConnectionStatus,
    pub session_id: Option<String>,
    /// Lines scrolled up from the bottom
    pub scroll_offset: usize,
    pub toast: Option<Toast>,
    /// Pending yes/no question
    pub confirm: Option<String>,
    pub server_url: String,
}

impl Screen {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            input: String::new(),
            status: ConnectionStatus::Connecting,
            session_id: None,
            scroll_offset: 0,
            toast: None,
            confirm: None,
            server_url: server_url.into(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.entries.iter().any(Entry::is_streaming)
    }

    pub fn push_input(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }

    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn add_message(&mut self, message: &Message) {
        let kind = match message.role {
            MessageRole::User => EntryKind::User,
            MessageRole::Assistant => EntryKind::Assistant,
        };
        self.entries.push(Entry {
            kind,
            content: message.content.clone(),
            time: message.time.clone(),
            turn_id: None,
        });
        self.scroll_offset = 0;
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.entries.push(Entry {
            kind: EntryKind::System,
            content: content.into(),
            time: clock_time(),
            turn_id: None,
        });
        self.scroll_offset = 0;
    }

    pub fn start_turn(&mut self, turn: &AssistantTurn) {
        self.entries.push(Entry {
            kind: EntryKind::Assistant,
            content: turn.display_text(),
            time: turn.time().to_string(),
            turn_id: Some(turn.id()),
        });
        self.scroll_offset = 0;
    }

    pub fn update_turn(&mut self, turn: &AssistantTurn) {
        if let Some(entry) = self.turn_entry(turn.id()) {
            entry.content = turn.display_text();
        }
    }

    /// Swap the placeholder for the committed text in place.
    pub fn finalize_turn(&mut self, turn: &AssistantTurn, message: &Message) {
        if let Some(entry) = self.turn_entry(turn.id()) {
            entry.content = message.content.clone();
            entry.turn_id = None;
        }
    }

    pub fn discard_turn(&mut self, turn: &AssistantTurn) {
        self.entries.retain(|e| e.turn_id != Some(turn.id()));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll_offset = 0;
    }

    pub fn show_toast(&mut self, text: impl Into<String>) {
        self.toast = Some(Toast::new(text));
    }

    /// Drop an expired toast. Returns true when the screen changed.
    pub fn expire_toast(&mut self) -> bool {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
            return true;
        }
        false
    }

    fn turn_entry(&mut self, turn_id: u64) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .rev()
            .find(|e| e.turn_id == Some(turn_id))
    }
}
