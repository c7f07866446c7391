//! Gallery tab rendering

use crate::tui::app::App;
use crate::tui::types::Tab;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Renders the prompt input and where the last picture went
pub fn render_gallery(f: &mut Frame, app: &App, area: Rect) {
    let screen = &app.gallery;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let input = Paragraph::new(screen.prompt.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Промпт (Enter: сгенерировать)"));
    f.render_widget(input, chunks[0]);

    let mut lines = Vec::new();
    if screen.loading {
        lines.push(Line::from(
            app.retry_line(Tab::Gallery)
                .unwrap_or_else(|| "Рисую Лёху...".to_string()),
        ));
    } else if let Some(status) = &screen.status_message {
        lines.push(Line::from(status.as_str()));
    } else {
        lines.push(Line::from("Пока пусто. Лёха ещё не позировал."));
    }
    if let Some(path) = &screen.saved_path {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Последний шедевр: {}", path.display())));
    }

    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(Color::Green))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Галерея")),
        chunks[1],
    );
}
