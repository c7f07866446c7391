//! SQLite-backed key-value store
//!
//! Holds the two client records: conversation history and settings. Reads are
//! best-effort: anything unreadable is logged and replaced by defaults.

use crate::storage::history::HISTORY_LIMIT;
use crate::storage::message::{Message, MessageStatus, Role, make_id};
use crate::storage::settings::Settings;
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Key of the conversation history record
pub const MESSAGES_KEY: &str = "lekha_terminal_messages_v1";

/// Key of the settings record
pub const SETTINGS_KEY: &str = "lekha_terminal_settings_v1";

/// Largest record the store will write or read back (5 MiB)
pub const MAX_RECORD_BYTES: usize = 5 * 1024 * 1024;

/// Decode a stored history record.
///
/// Returns `None` when the record is not a JSON array. Entries without a string
/// `text` and `role` are skipped; any role other than `user` reads as `model`;
/// a missing id or timestamp is filled in. Only the newest
/// [`HISTORY_LIMIT`] entries are kept.
pub fn parse_history(raw: &str) -> Option<Vec<Message>> {
    let entries = match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(entries) => entries,
        _ => return None,
    };

    let mut messages: Vec<Message> = entries
        .iter()
        .filter_map(|entry| {
            let text = entry.get("text")?.as_str()?;
            let role = entry.get("role")?.as_str()?;
            let id = match entry.get("id") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => make_id(),
            };
            let timestamp = entry
                .get("ts")
                .and_then(Value::as_i64)
                .unwrap_or_else(|| Utc::now().timestamp_millis());
            let status = entry
                .get("status")
                .and_then(|s| serde_json::from_value::<MessageStatus>(s.clone()).ok());

            Some(Message {
                id,
                role: if role == "user" { Role::User } else { Role::Model },
                text: text.to_string(),
                timestamp,
                status,
            })
        })
        .collect();

    if messages.len() > HISTORY_LIMIT {
        messages.drain(..messages.len() - HISTORY_LIMIT);
    }
    Some(messages)
}

/// SQLite key-value store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a store at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("Failed to create in-memory database: {}", e)))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Raw record under `key`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Write a raw record, refusing anything over [`MAX_RECORD_BYTES`]
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        if value.len() > MAX_RECORD_BYTES {
            return Err(Error::Storage(format!(
                "Record '{}' is {} bytes, limit is {}",
                key,
                value.len(),
                MAX_RECORD_BYTES
            )));
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// Delete a record
    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Best-effort read of a record: errors and oversize values read as absent
    fn read_record(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Ok(Some(raw)) if raw.len() > MAX_RECORD_BYTES => {
                warn!("Discarding oversize record '{}' ({} bytes)", key, raw.len());
                None
            }
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read record '{}': {}", key, e);
                None
            }
        }
    }

    /// Stored conversation, or an empty one
    pub fn load_history(&self) -> Vec<Message> {
        let Some(raw) = self.read_record(MESSAGES_KEY) else {
            return Vec::new();
        };
        match parse_history(&raw) {
            Some(messages) => {
                debug!("Loaded {} message(s) from history", messages.len());
                messages
            }
            None => {
                warn!("Ignoring corrupted history record");
                Vec::new()
            }
        }
    }

    /// Persist the newest [`HISTORY_LIMIT`] messages
    pub fn save_history(&self, messages: &[Message]) -> Result<()> {
        let start = messages.len().saturating_sub(HISTORY_LIMIT);
        let json = serde_json::to_string(&messages[start..])?;
        self.put(MESSAGES_KEY, &json)
    }

    /// Remove the stored conversation
    pub fn clear_history(&self) -> Result<()> {
        self.remove(MESSAGES_KEY)
    }

    /// Stored settings, or defaults
    pub fn load_settings(&self) -> Settings {
        self.read_record(SETTINGS_KEY)
            .map(|raw| Settings::from_json(&raw))
            .unwrap_or_default()
    }

    /// Persist settings
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.put(SETTINGS_KEY, &json)
    }
}
