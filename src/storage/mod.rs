//! Local storage module
//!
//! This module handles the client's persistent state:
//! - `message` - Message structures and delivery status
//! - `history` - The capped conversation log
//! - `settings` - Sound toggles
//! - `store` - SQLite key-value records holding both

// Submodules
pub mod history;
pub mod message;
pub mod settings;
pub mod store;

// Re-export commonly used types
pub use history::{HISTORY_LIMIT, History};
pub use message::{Message, MessageStatus, Role};
pub use settings::Settings;
pub use store::Store;
