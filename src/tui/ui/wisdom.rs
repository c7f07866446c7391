//! Wisdom tab rendering

use crate::tui::app::App;
use crate::tui::types::Tab;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Renders the current quote
pub fn render_wisdom(f: &mut Frame, app: &App, area: Rect) {
    let text = if app.wisdom.loading {
        app.retry_line(Tab::Wisdom)
            .unwrap_or_else(|| "Ищу правду...".to_string())
    } else {
        format!("«{}»", app.wisdom.quote)
    };

    let quote = Paragraph::new(text)
        .style(Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Мудрость дня (Enter: ещё)"),
        );
    f.render_widget(quote, area);
}
