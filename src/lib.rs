//! Lekha-Terminal - a roasting terminal on top of a generative-AI API
//!
//! This library provides the moving parts behind the LEKHA-TERMINAL front-end:
//! the `/api/gemini` JSON gateway, the client facade that talks to it, and the
//! resilience layer (retry, timeout, body cap, cooldown) both sides share.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod body;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod provider;
pub mod resilience;
pub mod server;
pub mod session;
pub mod storage;
pub mod tui;

#[cfg(test)]
mod tests;

/// Result type alias for Lekha-Terminal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Lekha-Terminal operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream model provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Storage operation error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP/Hyper error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// Outbound HTTP client error
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Initialize the Lekha-Terminal library with logging
pub fn init() {
    tracing_subscriber::fmt::init();
}
