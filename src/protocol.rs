//! Wire protocol for the `/api/gemini` gateway
//!
//! Requests are `{ "action": ..., "payload": {...} }`, responses are the
//! uniform envelope `{ "ok": true, "data": {...} }` or
//! `{ "ok": false, "error": "<CODE>" }`.

use hyper::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Error codes the gateway may put in a failed envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Anything but POST on the endpoint
    MethodNotAllowed,
    /// No provider credential configured
    ApiKeyMissing,
    /// Body was not valid UTF-8 JSON, or a payload had the wrong shape
    BadJson,
    /// Body exceeded the size ceiling
    PayloadTooLarge,
    /// Envelope without an action
    MissingAction,
    /// Action outside the supported set
    UnknownAction,
    /// Upstream call timed out somewhere in the retry sequence
    UpstreamTimeout,
    /// Any other upstream failure
    ServerError,
}

impl ErrorCode {
    /// HTTP status that accompanies the code
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::ApiKeyMissing => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::BadJson => StatusCode::BAD_REQUEST,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::MissingAction => StatusCode::BAD_REQUEST,
            ErrorCode::UnknownAction => StatusCode::BAD_REQUEST,
            ErrorCode::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire spelling of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ErrorCode::ApiKeyMissing => "API_KEY_MISSING",
            ErrorCode::BadJson => "BAD_JSON",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::MissingAction => "MISSING_ACTION",
            ErrorCode::UnknownAction => "UNKNOWN_ACTION",
            ErrorCode::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorCode::ServerError => "SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absent and `null` string fields both read as the empty string
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Payload of the `chat` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// The user's line
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

/// Payload of the `analyze` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzePayload {
    /// Base64 of a JPEG photo, without the `data:` prefix
    #[serde(rename = "imageData", default, deserialize_with = "null_as_empty")]
    pub image_data: String,
}

/// Payload of the `image` action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Situation to put Lekha in
    #[serde(default, deserialize_with = "null_as_empty")]
    pub prompt: String,
}

/// The closed set of gateway actions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Single-turn roast conversation
    Chat(ChatPayload),
    /// Roast a photo
    Analyze(AnalyzePayload),
    /// Generate a square caricature
    Image(ImagePayload),
    /// One-off roasting quote
    Quote,
}

impl Action {
    /// Wire name of the action
    pub fn name(&self) -> &'static str {
        match self {
            Action::Chat(_) => "chat",
            Action::Analyze(_) => "analyze",
            Action::Image(_) => "image",
            Action::Quote => "quote",
        }
    }

    /// Decode an action from a parsed request body.
    ///
    /// A body that is not an object, or whose `action` is absent, `null`, `false`
    /// or empty, has no action. Any other value that is not one of the four
    /// names is unknown. A payload of the wrong shape is `BAD_JSON`.
    pub fn from_envelope(body: &Value) -> std::result::Result<Self, ErrorCode> {
        let Some(fields) = body.as_object() else {
            return Err(ErrorCode::MissingAction);
        };

        let name = match fields.get("action") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => return Err(ErrorCode::MissingAction),
            Some(Value::String(s)) if s.is_empty() => return Err(ErrorCode::MissingAction),
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(ErrorCode::UnknownAction),
        };

        let payload = match fields.get("payload") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(p @ Value::Object(_)) => p.clone(),
            Some(_) => return Err(ErrorCode::BadJson),
        };

        fn decode<T: for<'de> Deserialize<'de>>(payload: Value) -> std::result::Result<T, ErrorCode> {
            serde_json::from_value(payload).map_err(|_| ErrorCode::BadJson)
        }

        match name {
            "chat" => Ok(Action::Chat(decode(payload)?)),
            "analyze" => Ok(Action::Analyze(decode(payload)?)),
            "image" => Ok(Action::Image(decode(payload)?)),
            "quote" => Ok(Action::Quote),
            _ => Err(ErrorCode::UnknownAction),
        }
    }

    /// Encode the action as a request envelope
    pub fn to_envelope(&self) -> Value {
        let payload = match self {
            Action::Chat(p) => json!(p),
            Action::Analyze(p) => json!(p),
            Action::Image(p) => json!(p),
            Action::Quote => json!({}),
        };
        json!({ "action": self.name(), "payload": payload })
    }
}

/// Successful result of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionData {
    /// `chat`, `analyze` and `quote`
    Text {
        /// Model reply, possibly empty
        text: String,
    },
    /// `image`; `null` when the model returned no picture
    Image {
        /// `data:image/png;base64,...`
        #[serde(rename = "dataUrl")]
        data_url: Option<String>,
    },
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the action succeeded
    pub ok: bool,
    /// Result, only when `ok`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ActionData>,
    /// Error code, only when not `ok`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl ApiResponse {
    /// Successful envelope
    pub fn success(data: ActionData) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed envelope
    pub fn failure(code: ErrorCode) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(code),
        }
    }
}
