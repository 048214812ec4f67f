use colored::Colorize;
use portal_chat::{AssistantTurn, ChatView, Message};
use std::io::{self, BufRead, Write};

const CLEAR_LINE: &str = "\r\x1b[K";

/// Line-oriented rendering of the chat on a terminal.
pub struct ConsoleView<W: Write> {
    out: W,
    /// Answer every confirmation with yes (`--yes`)
    assume_yes: bool,
    /// Echo user messages; off in the interactive loop where the user
    /// already sees what they typed
    echo_user: bool,
    /// Bytes of the live turn already written
    printed: usize,
    printed_newline: bool,
    typing_shown: bool,
}

impl ConsoleView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            assume_yes: false,
            echo_user: false,
            printed: 0,
            printed_newline: false,
            typing_shown: false,
        }
    }

    pub fn with_assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    pub fn with_echo_user(mut self, echo: bool) -> Self {
        self.echo_user = echo;
        self
    }

    pub fn out(&self) -> &W {
        &self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = write!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }

    fn reply_prefix() -> String {
        format!("{} ", "AI:".green().bold())
    }

    /// Print the part of the turn that is not on screen yet.
    fn catch_up(&mut self, turn: &AssistantTurn) {
        let content = turn.content();
        if let Some(fresh) = content.get(self.printed..) {
            if !fresh.is_empty() {
                self.printed_newline |= fresh.contains('\n');
                self.write(fresh);
            }
        }
        self.printed = content.len();
    }
}

impl<W: Write> ChatView for ConsoleView<W> {
    fn user_message(&mut self, message: &Message) {
        if self.echo_user {
            let line = format!("{} {}\n", "我:".cyan().bold(), message.content);
            self.write(&line);
        }
    }

    fn turn_started(&mut self, _turn: &AssistantTurn) {
        self.printed = 0;
        self.printed_newline = false;
        self.write(&Self::reply_prefix());
    }

    fn turn_updated(&mut self, turn: &AssistantTurn) {
        self.catch_up(turn);
    }

    fn turn_finalized(&mut self, turn: &AssistantTurn, message: &Message) {
        self.catch_up(turn);
        let footer = format!("\n{}\n", format!("   └─ {}", message.time).dimmed());
        self.write(&footer);
    }

    fn turn_discarded(&mut self, _turn: &AssistantTurn) {
        if self.printed_newline {
            let note = format!("\n{}\n", "(未完成的回复已丢弃)".dimmed());
            self.write(&note);
        } else {
            self.write(CLEAR_LINE);
        }
        self.printed = 0;
        self.printed_newline = false;
    }

    fn notify(&mut self, notice: &str) {
        eprintln!("{}", format!("⚠️  {}", notice).yellow());
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let question = format!("{} {} ", prompt.yellow(), "(y/N)".dimmed());
        self.write(&question);

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }

    fn typing(&mut self, active: bool) {
        if active && !self.typing_shown {
            self.typing_shown = true;
            let dots = format!("{}", "正在输入...".dimmed());
            self.write(&dots);
        } else if !active && self.typing_shown {
            self.typing_shown = false;
            let prefix = format!("{}{}", CLEAR_LINE, Self::reply_prefix());
            self.write(&prefix);
        }
    }

    fn conversation_cleared(&mut self) {
        let line = format!("{}\n", "✨ 对话已清空".cyan());
        self.write(&line);
    }

    fn session_changed(&mut self, session_id: Option<&str>) {
        match session_id {
            Some(id) => tracing::info!(session_id = %id, "Session changed"),
            None => tracing::info!("Session dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(view: &ConsoleView<Vec<u8>>) -> String {
        String::from_utf8_lossy(view.out()).to_string()
    }

    #[test]
    fn test_streamed_turn_prints_each_chunk_once() {
        let mut view = ConsoleView::new(Vec::new());
        let mut turn = AssistantTurn::new(1, "09:41");

        view.turn_started(&turn);
        turn.push_chunk("您好,");
        view.turn_updated(&turn);
        turn.push_chunk("请问有什么可以帮您?");
        view.turn_updated(&turn);
        let message = turn.finalize().unwrap();
        view.turn_finalized(&turn, &message);

        let out = rendered(&view);
        assert_eq!(out.matches("您好,").count(), 1);
        assert!(out.contains("请问有什么可以帮您?"));
        assert!(out.contains("09:41"));
    }

    #[test]
    fn test_blocking_turn_prints_on_finalize() {
        let mut view = ConsoleView::new(Vec::new());
        let mut turn = AssistantTurn::new(1, "09:41");

        view.turn_started(&turn);
        view.typing(true);
        turn.push_chunk("物业费可在服务中心缴纳");
        view.typing(false);
        let message = turn.finalize().unwrap();
        view.turn_finalized(&turn, &message);

        let out = rendered(&view);
        assert!(out.contains("正在输入..."));
        assert!(out.contains(CLEAR_LINE));
        assert!(out.contains("物业费可在服务中心缴纳"));
    }

    #[test]
    fn test_discard_clears_single_line_reply() {
        let mut view = ConsoleView::new(Vec::new());
        let mut turn = AssistantTurn::new(1, "09:41");

        view.turn_started(&turn);
        turn.push_chunk("半句");
        view.turn_updated(&turn);
        turn.discard();
        view.turn_discarded(&turn);

        assert!(rendered(&view).ends_with(CLEAR_LINE));
    }

    #[test]
    fn test_echo_and_assume_yes() {
        let mut view = ConsoleView::new(Vec::new())
            .with_echo_user(true)
            .with_assume_yes(true);

        view.user_message(&Message::user("门禁卡丢了"));
        assert!(view.confirm("确定要清空对话记录吗?"));
        assert!(rendered(&view).contains("门禁卡丢了"));
    }
}
