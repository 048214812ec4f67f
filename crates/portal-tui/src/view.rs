use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use portal_chat::{AssistantTurn, ChatView, Message};
use ratatui::{backend::Backend, Terminal};

use crate::app::Screen;
use crate::ui;

/// Renders chat callbacks straight into the terminal.
pub struct TuiView<B: Backend> {
    terminal: Terminal<B>,
    screen: Screen,
}

impl<B: Backend> TuiView<B> {
    pub fn new(terminal: Terminal<B>, screen: Screen) -> Self {
        Self { terminal, screen }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    pub fn redraw(&mut self) {
        let screen = &self.screen;
        if let Err(e) = self.terminal.draw(|f| ui::draw(f, screen)) {
            tracing::warn!("Failed to draw: {}", e);
        }
    }

    /// Periodic housekeeping from the event loop
    pub fn on_tick(&mut self) {
        if self.screen.expire_toast() {
            self.redraw();
        }
    }
}

impl<B: Backend> ChatView for TuiView<B> {
    fn user_message(&mut self, message: &Message) {
        self.screen.add_message(message);
        self.redraw();
    }

    fn turn_started(&mut self, turn: &AssistantTurn) {
        self.screen.start_turn(turn);
        self.redraw();
    }

    fn turn_updated(&mut self, turn: &AssistantTurn) {
        self.screen.update_turn(turn);
        self.redraw();
    }

    fn turn_finalized(&mut self, turn: &AssistantTurn, message: &Message) {
        self.screen.finalize_turn(turn, message);
        self.redraw();
    }

    fn turn_discarded(&mut self, turn: &AssistantTurn) {
        self.screen.discard_turn(turn);
        self.redraw();
    }

    fn notify(&mut self, notice: &str) {
        self.screen.show_toast(notice);
        self.redraw();
    }

    /// Blocks on the keyboard until y or n.
    fn confirm(&mut self, prompt: &str) -> bool {
        self.screen.confirm = Some(prompt.to_string());
        self.redraw();

        let answer = loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => break true,
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => break false,
                    _ => {}
                },
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to read confirmation: {}", e);
                    break false;
                }
            }
        };

        self.screen.confirm = None;
        self.redraw();
        answer
    }

    fn conversation_cleared(&mut self) {
        self.screen.clear();
        self.redraw();
    }

    fn session_changed(&mut self, session_id: Option<&str>) {
        self.screen.session_id = session_id.map(str::to_string);
        self.redraw();
    }
}
