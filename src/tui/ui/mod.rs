//! UI rendering module - tab-specific rendering functions
//!
//! The frame is split into a header with the tab strip, the active tab's body
//! and a footer with key help and sound toggles.

mod chat;
mod chrome;
mod gallery;
mod vision;
mod wisdom;

use crate::tui::app::App;
use crate::tui::types::Tab;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

// Re-export render functions
pub use chat::{render_chat, wrap_text};
pub use chrome::{render_footer, render_header};
pub use gallery::render_gallery;
pub use vision::render_vision;
pub use wisdom::render_wisdom;

/// Main UI rendering function - dispatches to tab-specific render functions
pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Header and tabs
            Constraint::Min(8),    // Active tab
            Constraint::Length(4), // Toggles and help
        ])
        .split(f.size());

    render_header(f, app, chunks[0]);
    match app.current_tab {
        Tab::Chat => render_chat(f, app, chunks[1]),
        Tab::Vision => render_vision(f, app, chunks[1]),
        Tab::Gallery => render_gallery(f, app, chunks[1]),
        Tab::Wisdom => render_wisdom(f, app, chunks[1]),
    }
    render_footer(f, app, chunks[2]);
}
