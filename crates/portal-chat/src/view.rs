use crate::message::Message;
use crate::turn::AssistantTurn;

/// Presentation side of a chat surface.
///
/// The client drives these callbacks in order; a view only renders and never
/// touches session or conversation state itself.
pub trait ChatView {
    /// A user message was appended to the conversation.
    fn user_message(&mut self, message: &Message);

    /// The assistant placeholder was created (marker visible, no text yet).
    fn turn_started(&mut self, turn: &AssistantTurn);

    /// New text arrived for the placeholder.
    fn turn_updated(&mut self, turn: &AssistantTurn);

    /// The placeholder became a committed message; the marker is gone.
    fn turn_finalized(&mut self, turn: &AssistantTurn, message: &Message);

    /// The placeholder must disappear without a trace.
    fn turn_discarded(&mut self, turn: &AssistantTurn);

    /// Transient notification, never part of the conversation.
    fn notify(&mut self, notice: &str);

    /// Yes/no prompt. Returning false cancels the operation.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Waiting-for-reply indicator, only called when the surface enables it.
    fn typing(&mut self, _active: bool) {}

    fn conversation_cleared(&mut self) {}

    fn session_changed(&mut self, _session_id: Option<&str>) {}
}
