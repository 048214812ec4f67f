use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{ConnectionStatus, Entry, EntryKind, Screen};

pub fn draw(f: &mut Frame, screen: &Screen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Messages
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    draw_header(f, screen, chunks[0]);
    draw_messages(f, screen, chunks[1]);
    draw_input(f, screen, chunks[2]);
    match &screen.confirm {
        Some(prompt) => draw_confirm_bar(f, prompt, chunks[3]),
        None => draw_status_bar(f, screen, chunks[3]),
    }

    if let Some(toast) = &screen.toast {
        draw_toast(f, &toast.text, chunks[1]);
    }
}

fn draw_header(f: &mut Frame, screen: &Screen, area: Rect) {
    let status_color = match screen.status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Disconnected => Color::Red,
        ConnectionStatus::Connecting => Color::Yellow,
    };

    let header_text = Line::from(vec![
        Span::styled(" 🏠 ", Style::default()),
        Span::styled(
            "社区智能客服",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Cyan),
        ),
        Span::styled("  |  ", Style::default().fg(Color::Gray)),
        Span::styled(screen.status.to_string(), Style::default().fg(status_color)),
        Span::styled(
            format!("  {}", screen.server_url),
            Style::default().fg(Color::DarkGray),
        ),
        if screen.is_streaming() {
            Span::styled("  ◐ 回复中...", Style::default().fg(Color::Yellow))
        } else {
            Span::raw("")
        },
    ]);

    let header = Paragraph::new(header_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn draw_messages(f: &mut Frame, screen: &Screen, area: Rect) {
    let lines: Vec<Line> = screen.entries.iter().flat_map(format_entry).collect();

    let title = match screen.session_id.as_deref() {
        Some(id) => format!("对话 (会话: {})", short_id(id)),
        None => "对话".to_string(),
    };

    // stick to the bottom unless the user scrolled up
    let visible_height = area.height.saturating_sub(2) as usize;
    let top = lines
        .len()
        .saturating_sub(visible_height)
        .saturating_sub(screen.scroll_offset);

    let messages = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(top).unwrap_or(u16::MAX), 0));

    f.render_widget(messages, area);
}

fn format_entry(entry: &Entry) -> Vec<Line<'_>> {
    let (prefix, style) = match entry.kind {
        EntryKind::User => ("👤 我: ", Style::default().fg(Color::Cyan)),
        EntryKind::Assistant => ("🤖 AI: ", Style::default().fg(Color::Green)),
        EntryKind::System => ("⚙️ ", Style::default().fg(Color::Yellow)),
    };

    let mut lines = Vec::new();
    for (i, text) in entry.content.split('\n').enumerate() {
        let lead = if i == 0 { prefix } else { "   " };
        lines.push(Line::from(vec![
            Span::styled(lead, style),
            Span::styled(text, style),
        ]));
    }

    lines.push(Line::from(vec![Span::styled(
        format!("   └─ {} ", entry.time),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )]));
    lines.push(Line::from(""));

    lines
}

fn draw_input(f: &mut Frame, screen: &Screen, area: Rect) {
    let input_text = if screen.is_streaming() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::styled(
                "正在回复... 按 Esc 停止",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    } else if screen.input.is_empty() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Green)),
            Span::styled(
                "请输入您的问题, 按 Enter 发送...",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Green)),
            Span::styled(screen.input.as_str(), Style::default().fg(Color::White)),
        ])
    };

    let input = Paragraph::new(input_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title("输入")
            .border_style(Style::default().fg(Color::Blue)),
    );

    f.render_widget(input, area);

    if !screen.is_streaming() && screen.confirm.is_none() {
        // border + "> " prompt
        let offset = cells(&screen.input).saturating_add(3);
        let x = area.x.saturating_add(offset).min(area.right().saturating_sub(2));
        f.set_cursor(x, area.y + 1);
    }
}

fn draw_status_bar(f: &mut Frame, screen: &Screen, area: Rect) {
    let help_text = if screen.is_streaming() {
        "[Esc] 停止  [Ctrl+C] 退出"
    } else {
        "[Enter] 发送  [Ctrl+L] 清空  [↑↓] 滚动  [Ctrl+C] 退出"
    };

    let messages = screen
        .entries
        .iter()
        .filter(|e| e.kind != EntryKind::System)
        .count();
    let status = format!(" 消息: {} | {}", messages, help_text);

    let status_bar = Paragraph::new(status)
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::REVERSED),
        );

    f.render_widget(status_bar, area);
}

fn draw_confirm_bar(f: &mut Frame, prompt: &str, area: Rect) {
    let bar = Paragraph::new(format!(" {}  [y] 确定  [n] 取消", prompt))
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(bar, area);
}

fn draw_toast(f: &mut Frame, text: &str, area: Rect) {
    let width = cells(text).saturating_add(4).min(area.width);
    let area = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + 1,
        width,
        height: 3.min(area.height),
    };

    let toast = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White).bg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(Clear, area);
    f.render_widget(toast, area);
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Terminal columns taken by `text`, clamped to what a `Rect` can hold
fn cells(text: &str) -> u16 {
    u16::try_from(text.width()).unwrap_or(u16::MAX)
}
