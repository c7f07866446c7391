//! Bounded request body reader
//!
//! Reads an incoming body frame by frame and refuses it as soon as the running
//! total passes the ceiling, without polling the remaining frames.

use crate::protocol::ErrorCode;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::pin::pin;
use tracing::debug;

/// Largest accepted request body (5 MiB)
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Reasons a body could not be turned into JSON
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// Running total exceeded the ceiling
    #[error("PAYLOAD_TOO_LARGE: body exceeds {limit} bytes")]
    TooLarge {
        /// The ceiling that was crossed
        limit: usize,
    },
    /// Body is not UTF-8 or not JSON
    #[error("BAD_JSON: {0}")]
    BadJson(String),
    /// The connection failed while reading
    #[error("Failed to read body: {0}")]
    Read(String),
}

impl BodyError {
    /// Envelope code for the error; read failures are reported as bad JSON
    pub fn code(&self) -> ErrorCode {
        match self {
            BodyError::TooLarge { .. } => ErrorCode::PayloadTooLarge,
            BodyError::BadJson(_) | BodyError::Read(_) => ErrorCode::BadJson,
        }
    }
}

/// Read `body` up to `limit` bytes and parse it as JSON.
///
/// An empty body yields an empty object.
pub async fn read_json_body<B>(body: B, limit: usize) -> std::result::Result<Value, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let mut body = pin!(body);
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut total = 0usize;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| BodyError::Read(e.to_string()))?;
        if let Ok(data) = frame.into_data() {
            total += data.len();
            if total > limit {
                debug!("Rejecting body: {} bytes read, limit {}", total, limit);
                return Err(BodyError::TooLarge { limit });
            }
            chunks.push(data);
        }
    }

    let raw = String::from_utf8(chunks.concat())
        .map_err(|e| BodyError::BadJson(format!("invalid UTF-8: {}", e)))?;

    if raw.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_str(&raw).map_err(|e| BodyError::BadJson(e.to_string()))
}
