//! Vision tab rendering

use crate::tui::app::App;
use crate::tui::types::Tab;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Renders the image path input and the critique
pub fn render_vision(f: &mut Frame, app: &App, area: Rect) {
    let screen = &app.vision;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Path input
            Constraint::Length(3), // Status
            Constraint::Min(3),    // Critique
        ])
        .split(area);

    let input = Paragraph::new(screen.path_input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Путь к фото (Enter: скан)"));
    f.render_widget(input, chunks[0]);

    let status = if screen.loading {
        app.retry_line(Tab::Vision)
            .unwrap_or_else(|| "Сканирую...".to_string())
    } else {
        screen.status_message.clone().unwrap_or_default()
    };
    f.render_widget(
        Paragraph::new(status)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Статус")),
        chunks[1],
    );

    let analysis = screen
        .analysis
        .as_deref()
        .unwrap_or("Загрузи фото, и сканер скажет всё, что думает о твоём стиле.");
    f.render_widget(
        Paragraph::new(analysis)
            .style(Style::default().fg(Color::Green))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Вердикт")),
        chunks[2],
    );
}
