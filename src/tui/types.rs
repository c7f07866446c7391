//! Core types for TUI tabs and background results

use crate::client::Reply;

/// Application tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    /// Conversation with the terminal
    Chat,
    /// Photo critique
    Vision,
    /// Caricature generation
    Gallery,
    /// Quote of the day
    Wisdom,
}

impl Tab {
    /// Get all tabs in order
    pub fn all() -> [Self; 4] {
        [Self::Chat, Self::Vision, Self::Gallery, Self::Wisdom]
    }

    /// Get display label for tab
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chat => "ЧАТ",
            Self::Vision => "СКАНЕР",
            Self::Gallery => "ГАЛЕРЕЯ",
            Self::Wisdom => "МУДРОСТЬ",
        }
    }

    /// Position in [`Tab::all`]
    pub fn index(&self) -> usize {
        match self {
            Self::Chat => 0,
            Self::Vision => 1,
            Self::Gallery => 2,
            Self::Wisdom => 3,
        }
    }

    /// Tab to the right, wrapping around
    pub fn next(&self) -> Self {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    /// Tab to the left, wrapping around
    pub fn previous(&self) -> Self {
        let all = Self::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}

/// Result delivered from a spawned facade call to the UI loop
#[derive(Debug)]
pub enum TaskEvent {
    /// An attempt failed and another one is coming
    Retrying {
        /// Tab that issued the call
        tab: Tab,
        /// Number of the failed attempt
        attempt: u32,
    },
    /// Chat reply for the user message `user_id`
    ChatDone {
        /// Id of the user message awaiting the reply
        user_id: String,
        /// Reply or apology
        reply: Reply<String>,
    },
    /// Photo critique
    VisionDone(Reply<String>),
    /// Generated picture
    GalleryDone(Reply<Option<String>>),
    /// Quote
    WisdomDone(Reply<String>),
}
