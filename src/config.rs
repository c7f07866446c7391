//! Environment-driven configuration for the gateway and the terminal client

use crate::provider::gemini::DEFAULT_BASE_URL;
use crate::resilience::{RetryPolicy, UPSTREAM_TIMEOUT};
use crate::body::MAX_BODY_BYTES;
use crate::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the provider credential
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Default gateway listen address
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Default gateway endpoint seen from the client
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api/gemini";

/// Default directory for the client database
pub const DEFAULT_DATA_DIR: &str = "./app_data";

/// Where the gateway looks up the provider credential.
///
/// The lookup happens on every request, so a server started without a key
/// keeps serving `API_KEY_MISSING` until one appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read the named environment variable per request
    Env(String),
    /// Fixed value (tests, embedding)
    Fixed(Option<String>),
}

impl CredentialSource {
    /// Current credential; blank values count as missing
    pub fn resolve(&self) -> Option<String> {
        let value = match self {
            CredentialSource::Env(var) => std::env::var(var).ok(),
            CredentialSource::Fixed(value) => value.clone(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: SocketAddr,
    /// Credential lookup
    pub credentials: CredentialSource,
    /// Provider API root
    pub base_url: String,
    /// Retry policy for upstream calls
    pub retry: RetryPolicy,
    /// Request body ceiling in bytes
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    ///
    /// Recognised keys: `LEKHA_BIND`, `GEMINI_BASE_URL`,
    /// `LEKHA_UPSTREAM_TIMEOUT_MS`. The credential itself is read per request
    /// from `GEMINI_API_KEY`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("LEKHA_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| Error::Config(format!("Invalid LEKHA_BIND '{}': {}", bind, e)))?;

        let base_url = lookup("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match lookup("LEKHA_UPSTREAM_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse().map_err(|e| {
                Error::Config(format!("Invalid LEKHA_UPSTREAM_TIMEOUT_MS '{}': {}", raw, e))
            })?),
            None => UPSTREAM_TIMEOUT,
        };

        Ok(Self {
            bind_addr,
            credentials: CredentialSource::Env(API_KEY_VAR.to_string()),
            base_url,
            retry: RetryPolicy::server().with_timeout(timeout),
            max_body_bytes: MAX_BODY_BYTES,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            credentials: CredentialSource::Env(API_KEY_VAR.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::server(),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

/// Terminal client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway endpoint
    pub api_url: String,
    /// Directory holding `lekha.db`
    pub data_dir: PathBuf,
    /// Retry policy for gateway calls
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (`LEKHA_API_URL`, `LEKHA_DATA_DIR`)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_url: lookup("LEKHA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            data_dir: PathBuf::from(lookup("LEKHA_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            retry: RetryPolicy::client(),
        }
    }

    /// Path of the client database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("lekha.db")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
