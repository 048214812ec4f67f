use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use portal_chat::{
    ApiConfig, ChatApi, ChatOptions, FileSessionStore, ReplyMode, StreamingChatClient,
};
use portal_config::{Config, ConfigManager};
use portal_observability::LogManager;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

mod app;
mod ui;
mod view;

use app::{ConnectionStatus, Screen};
use view::TuiView;

type TuiClient<B> = StreamingChatClient<TuiView<B>>;

const TICK_RATE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = ConfigManager::load_default().await?;
    let config = manager.snapshot().await;

    // The terminal belongs to the UI, so logs go to a file
    let _log_manager = init_logging(&config)?;
    let _span = portal_observability::create_surface_span("pc").entered();

    let api = ChatApi::new(&api_config(&config))?;
    let session_dir = config
        .chat
        .session_dir
        .as_deref()
        .and_then(portal_config::expand_tilde)
        .or_else(portal_config::default_session_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not resolve the session directory"))?;
    let store = Arc::new(FileSessionStore::new(session_dir));
    let options = ChatOptions::new(config.chat.pc_session_key.clone()).with_reply_mode(ReplyMode::Stream);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;

    let view = TuiView::new(terminal, Screen::new(config.server.url.clone()));
    let mut client = StreamingChatClient::new(api, store, view, options);

    let res = run_app(&mut client).await;

    // Restore terminal
    client.dispose();
    let terminal = client.view_mut().terminal_mut();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!("TUI exited with error: {:?}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn init_logging(config: &Config) -> anyhow::Result<LogManager> {
    let log_path = config
        .logging
        .file
        .as_deref()
        .and_then(portal_config::expand_tilde)
        .or_else(portal_config::default_log_path)
        .ok_or_else(|| anyhow::anyhow!("Could not resolve the log file path"))?;

    let observability = portal_observability::Config::from(config)
        .with_app_name("portal-tui")
        .with_log_file(log_path);
    Ok(LogManager::init(&observability)?)
}

fn api_config(config: &Config) -> ApiConfig {
    ApiConfig {
        server_url: config.server.url.clone(),
        api_path: config.server.api_path.clone(),
        connect_timeout: Duration::from_secs(config.server.connect_timeout_secs),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    }
}

async fn check_connection<B: Backend>(client: &mut TuiClient<B>) {
    let healthy = client.api().health_check().await;
    let screen = client.view_mut().screen_mut();
    if healthy {
        screen.status = ConnectionStatus::Connected;
        screen.add_system_message("已连接社区智能客服");
    } else {
        screen.status = ConnectionStatus::Disconnected;
        let notice = format!("无法连接客服服务: {}", screen.server_url);
        screen.add_system_message(notice);
    }
    client.view_mut().redraw();
}

async fn run_app<B: Backend>(client: &mut TuiClient<B>) -> anyhow::Result<()> {
    client.view_mut().redraw();
    check_connection(client).await;
    client.init().await?;

    loop {
        client.view_mut().on_tick();

        // Handle events
        if !event::poll(TICK_RATE)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if handle_key_event(client, key).await? {
            return Ok(());
        }
        client.view_mut().redraw();
    }
}

/// Returns true when the app should quit.
async fn handle_key_event<B: Backend>(client: &mut TuiClient<B>, key: KeyEvent) -> anyhow::Result<bool> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => {
            client.dispose();
            return Ok(true);
        }
        KeyCode::Char('l') if ctrl => {
            client.clear_chat().await?;
        }
        KeyCode::Enter => {
            let text = client.view_mut().screen_mut().take_input();
            if !text.trim().is_empty() {
                return send_with_keys(client, &text).await;
            }
        }
        KeyCode::Char(c) => {
            client.view_mut().screen_mut().push_input(c);
        }
        KeyCode::Backspace => {
            client.view_mut().screen_mut().pop_input();
        }
        KeyCode::Up => {
            client.view_mut().screen_mut().scroll_up(1);
        }
        KeyCode::Down => {
            client.view_mut().screen_mut().scroll_down(1);
        }
        KeyCode::PageUp => {
            client.view_mut().screen_mut().scroll_up(10);
        }
        KeyCode::PageDown => {
            client.view_mut().screen_mut().scroll_down(10);
        }
        _ => {}
    }
    Ok(false)
}

/// Run one turn while still listening for Esc and Ctrl+C.
async fn send_with_keys<B: Backend>(client: &mut TuiClient<B>, text: &str) -> anyhow::Result<bool> {
    let handle = client.handle();
    let mut quit = false;

    let send = client.send_message(text);
    tokio::pin!(send);
    let mut ticker = tokio::time::interval(TICK_RATE / 2);

    loop {
        tokio::select! {
            outcome = &mut send => {
                let outcome = outcome?;
                tracing::debug!("Turn ended: {:?}", outcome);
                return Ok(quit);
            }
            _ = ticker.tick() => {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Esc => {
                            handle.stop_turn();
                        }
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            handle.dispose();
                            quit = true;
                        }
                        // input stays locked while a reply is streaming
                        _ => {}
                    }
                }
            }
        }
    }
}
