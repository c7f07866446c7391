//! Header and footer rendering

use crate::tui::app::App;
use crate::tui::types::Tab;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

/// Renders the title and tab strip
pub fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::all().iter().map(|t| Line::from(t.label())).collect();

    let tabs = Tabs::new(titles)
        .select(app.current_tab.index())
        .style(Style::default().fg(Color::Green))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " LEKHA-TERMINAL v2.0 ",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )),
        );
    f.render_widget(tabs, area);
}

/// Renders the sound toggles above the key help
pub fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let on_off = |on: bool| if on { "ON" } else { "OFF" };
    let toggles = Line::from(vec![
        Span::styled(
            format!("F2 SOUND: {} | ", on_off(app.settings.sound_on)),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!("F3 SOUND PRO: {}", on_off(app.settings.sound_pro_on)),
            Style::default().fg(if app.settings.pro_effects_active() {
                Color::Green
            } else {
                Color::DarkGray
            }),
        ),
    ]);
    let help = Line::from(Span::styled(
        "Tab: вкладка | Enter: пуск | Ctrl+L: стереть чат | Esc: выход",
        Style::default().fg(Color::DarkGray),
    ));

    let footer = Paragraph::new(vec![toggles, help]).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
