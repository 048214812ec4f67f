#![allow(dead_code)]

use portal_chat::{
    ApiConfig, AssistantTurn, ChatApi, ChatHandle, ChatOptions, ChatView, Message,
    SessionStore, StreamingChatClient,
};
use std::sync::Arc;

/// Everything a view was asked to do, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    User(String),
    Started(u64),
    Updated(String),
    Finalized(String),
    Discarded(u64),
    Notice(String),
    Confirm(String),
    Typing(bool),
    Cleared,
    Session(Option<String>),
}

/// Mock view that records callbacks instead of rendering them
#[derive(Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
    pub confirm_answer: bool,
    /// Stop the running turn as soon as the first chunk is shown
    pub stop_on_update: Option<ChatHandle>,
    /// Dispose the client as soon as the first chunk is shown
    pub dispose_on_update: Option<ChatHandle>,
}

impl RecordingView {
    pub fn confirming() -> Self {
        Self {
            confirm_answer: true,
            ..Self::default()
        }
    }

    pub fn notices(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}

impl ChatView for RecordingView {
    fn user_message(&mut self, message: &Message) {
        self.events.push(ViewEvent::User(message.content.clone()));
    }

    fn turn_started(&mut self, turn: &AssistantTurn) {
        self.events.push(ViewEvent::Started(turn.id()));
    }

    fn turn_updated(&mut self, turn: &AssistantTurn) {
        self.events.push(ViewEvent::Updated(turn.display_text()));
        if let Some(handle) = self.stop_on_update.take() {
            handle.stop_turn();
        }
        if let Some(handle) = self.dispose_on_update.take() {
            handle.dispose();
        }
    }

    fn turn_finalized(&mut self, turn: &AssistantTurn, message: &Message) {
        assert_eq!(turn.display_text(), message.content);
        self.events.push(ViewEvent::Finalized(message.content.clone()));
    }

    fn turn_discarded(&mut self, turn: &AssistantTurn) {
        self.events.push(ViewEvent::Discarded(turn.id()));
    }

    fn notify(&mut self, notice: &str) {
        self.events.push(ViewEvent::Notice(notice.to_string()));
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.events.push(ViewEvent::Confirm(prompt.to_string()));
        self.confirm_answer
    }

    fn typing(&mut self, active: bool) {
        self.events.push(ViewEvent::Typing(active));
    }

    fn conversation_cleared(&mut self) {
        self.events.push(ViewEvent::Cleared);
    }

    fn session_changed(&mut self, session_id: Option<&str>) {
        self.events.push(ViewEvent::Session(session_id.map(str::to_string)));
    }
}

pub fn build_client(
    server_url: &str,
    store: Arc<dyn SessionStore>,
    view: RecordingView,
    options: ChatOptions,
) -> StreamingChatClient<RecordingView> {
    let api = ChatApi::new(&ApiConfig::new(server_url)).unwrap();
    StreamingChatClient::new(api, store, view, options)
}

/// Body of a reply stream, one `data:` record per payload
pub fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|p| format!("data: {}\n\n", p))
        .collect()
}
