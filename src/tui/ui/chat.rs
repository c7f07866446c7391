//! Chat tab rendering

use crate::storage::{MessageStatus, Role};
use crate::tui::app::App;
use crate::tui::types::Tab;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn status_color(status: MessageStatus) -> Color {
    match status {
        MessageStatus::Sending => Color::Yellow,
        MessageStatus::Sent => Color::DarkGray,
        MessageStatus::Failed => Color::Red,
    }
}

fn display_width(s: &str) -> usize {
    Span::raw(s).width()
}

/// Break `text` into rows no wider than `width` columns.
///
/// Line breaks in `text` always start a new row. Words move to the next row
/// whole unless they are wider than a row on their own, in which case they
/// are split by character. Empty text still takes one row.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for segment in text.lines() {
        let mut row = String::new();
        let mut row_width = 0;

        for (i, word) in segment.split(' ').enumerate() {
            let word_width = display_width(word);
            let gap = usize::from(i > 0 && row_width > 0);
            if row_width + gap + word_width <= width {
                if gap > 0 {
                    row.push(' ');
                }
                row.push_str(word);
                row_width += gap + word_width;
                continue;
            }

            if row_width > 0 {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            let mut buf = [0u8; 4];
            for c in word.chars() {
                let char_width = display_width(&*c.encode_utf8(&mut buf));
                if row_width + char_width > width && row_width > 0 {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(c);
                row_width += char_width;
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

/// Renders the conversation log and the input box
pub fn render_chat(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Message history
            Constraint::Length(1), // Retry line
            Constraint::Length(3), // Input box
        ])
        .split(area);

    let history = app.session.history();
    if history.is_empty() {
        let empty_msg = Paragraph::new("Пиши, Лёха. Терминал уже готов тебя разнести.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Лог"));
        f.render_widget(empty_msg, chunks[0]);
    } else {
        // Rows are wrapped here so that one Line is exactly one screen row
        let inner_width = chunks[0].width.saturating_sub(2) as usize;
        let mut lines: Vec<Line> = Vec::new();
        for msg in history.messages() {
            let role_color = match msg.role {
                Role::User => Color::Cyan,
                Role::Model => Color::Green,
            };
            let mut header = vec![
                Span::styled(
                    format!("{} ", msg.role.label()),
                    Style::default().fg(role_color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(msg.time_label(), Style::default().fg(Color::DarkGray)),
            ];
            // Status tags only make sense under Lekha's own messages
            if let (Role::User, Some(status)) = (msg.role, msg.status) {
                header.push(Span::styled(
                    format!(" [{}]", status.label()),
                    Style::default().fg(status_color(status)),
                ));
            }
            lines.push(Line::from(header));
            for row in wrap_text(&msg.text, inner_width) {
                lines.push(Line::from(Span::styled(row, Style::default().fg(Color::White))));
            }
            lines.push(Line::from(""));
        }

        // Keep the newest rows in view
        let visible = chunks[0].height.saturating_sub(2) as usize;
        let scroll = lines.len().saturating_sub(visible).min(u16::MAX as usize) as u16;

        let messages_widget = Paragraph::new(lines)
            .scroll((scroll, 0))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Лог ({})", history.len())),
            );
        f.render_widget(messages_widget, chunks[0]);
    }

    let retry = app.retry_line(Tab::Chat).unwrap_or_default();
    f.render_widget(
        Paragraph::new(retry).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        chunks[1],
    );

    let title = if app.session.is_loading() {
        "Терминал думает..."
    } else {
        "Сообщение"
    };
    let input_widget = Paragraph::new(app.chat_input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input_widget, chunks[2]);
}
