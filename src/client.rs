//! Client facade for the `/api/gemini` gateway
//!
//! Each call posts an action envelope through the client retry policy and never
//! fails: on exhaustion it substitutes a canned persona line (or `None` for
//! pictures). Whether a reply is real or canned travels alongside it as a
//! [`ReplyOutcome`].

use crate::protocol::{Action, ActionData, AnalyzePayload, ApiResponse, ChatPayload, ErrorCode, ImagePayload};
use crate::resilience::{AttemptFailure, RetryObserver, RetryPolicy};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::{debug, warn};

/// Lines used when a chat call cannot be completed
pub const CHAT_FALLBACKS: [&str; 3] = [
    "Лёха, сегодня я молчу. Но ты всё равно не прав.",
    "Связь пропала, Лёх. Как и твои деньги до зарплаты.",
    "Терминал ушёл курить. Лёха, подожди и подумай над своим поведением.",
];

/// Line used when a chat call answered with nothing
pub const CHAT_EMPTY: &str = "Лёха, мне даже ответить нечего. Ты опять всех удивил.";

/// Line used when a photo critique cannot be completed
pub const ANALYZE_FALLBACK: &str = "Сканер отвалился. Лёха опять что-то сломал.";

/// Line used when a photo critique answered with nothing
pub const ANALYZE_EMPTY: &str = "Даже сканер завис от такой нечёткости, Лёх.";

/// Line used when a quote cannot be fetched
pub const QUOTE_FALLBACK: &str = "Цитатник умер. Лёха, походу без вдохновения.";

/// Line used when a quote came back empty
pub const QUOTE_EMPTY: &str = "Лёха, ты где?";

/// Whether a reply came from the model or from the canned set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The gateway answered
    Answered,
    /// Every attempt failed and a canned value was substituted
    FellBack,
}

/// A value plus how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    /// What the caller shows
    pub value: T,
    /// Real answer or substitute
    pub outcome: ReplyOutcome,
}

impl<T> Reply<T> {
    /// Real answer
    pub fn answered(value: T) -> Self {
        Self {
            value,
            outcome: ReplyOutcome::Answered,
        }
    }

    /// Canned substitute
    pub fn fell_back(value: T) -> Self {
        Self {
            value,
            outcome: ReplyOutcome::FellBack,
        }
    }

    /// Whether the value is a substitute
    pub fn is_fallback(&self) -> bool {
        self.outcome == ReplyOutcome::FellBack
    }
}

/// Pick one of [`CHAT_FALLBACKS`]
pub fn pick_chat_fallback() -> &'static str {
    CHAT_FALLBACKS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(CHAT_FALLBACKS[0])
}

/// Why a single gateway call failed (logged, never surfaced)
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Connection or I/O failure
    #[error("transport failure: {0}")]
    Transport(String),
    /// Non-2xx status
    #[error("gateway returned {status} ({})", .code.map(|c| c.as_str()).unwrap_or("no code"))]
    Status {
        /// HTTP status
        status: u16,
        /// Envelope code, when the body carried one
        code: Option<ErrorCode>,
    },
    /// 2xx with `ok: false`
    #[error("gateway refused the action ({})", .0.map(|c| c.as_str()).unwrap_or("no code"))]
    Rejected(Option<ErrorCode>),
    /// Body did not match the action
    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// The four gateway actions as seen by the UI
#[async_trait]
pub trait LekhaApi: Send + Sync {
    /// One roast reply to `message`
    async fn chat(&self, message: &str, observer: Option<RetryObserver<'_>>) -> Reply<String>;

    /// Critique of a base64 JPEG
    async fn analyze_style(&self, image_data: &str, observer: Option<RetryObserver<'_>>) -> Reply<String>;

    /// Data URL of a generated caricature, `None` when there is none
    async fn generate_crazy_lekha(
        &self,
        prompt: &str,
        observer: Option<RetryObserver<'_>>,
    ) -> Reply<Option<String>>;

    /// A roasting quote
    async fn get_lekha_quote(&self, observer: Option<RetryObserver<'_>>) -> Reply<String>;
}

/// HTTP implementation of [`LekhaApi`]
#[derive(Debug, Clone)]
pub struct ClientFacade {
    http: reqwest::Client,
    api_url: String,
    retry: RetryPolicy,
}

impl ClientFacade {
    /// Facade for the gateway at `api_url` with the client retry policy
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_policy(api_url, RetryPolicy::client())
    }

    /// Facade with a custom retry policy
    pub fn with_policy(api_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            retry,
        }
    }

    /// Gateway endpoint
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn call(&self, action: &Action, observer: Option<RetryObserver<'_>>) -> std::result::Result<ActionData, CallError> {
        let envelope = action.to_envelope();
        self.retry
            .run(|| self.post(&envelope), observer)
            .await
            .map_err(|e| {
                warn!("'{}' call failed after {} attempt(s): {}", action.name(), e.attempts, e.last);
                match e.last {
                    AttemptFailure::Failed(err) => err,
                    AttemptFailure::TimedOut(t) => CallError::Transport(t.to_string()),
                }
            })
    }

    async fn post(&self, envelope: &Value) -> std::result::Result<ActionData, CallError> {
        debug!("POST {}", self.api_url);

        let response = self
            .http
            .post(&self.api_url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let code = response.json::<ApiResponse>().await.ok().and_then(|r| r.error);
            return Err(CallError::Status {
                status: status.as_u16(),
                code,
            });
        }

        let envelope: ApiResponse = response
            .json()
            .await
            .map_err(|e| CallError::Malformed(e.to_string()))?;

        match envelope {
            ApiResponse {
                ok: true,
                data: Some(data),
                ..
            } => Ok(data),
            ApiResponse { error, .. } => Err(CallError::Rejected(error)),
        }
    }

    async fn text_action(
        &self,
        action: Action,
        observer: Option<RetryObserver<'_>>,
        fallback: &str,
        empty: &str,
    ) -> Reply<String> {
        match self.call(&action, observer).await {
            Ok(ActionData::Text { text }) if text.trim().is_empty() => Reply::answered(empty.to_string()),
            Ok(ActionData::Text { text }) => Reply::answered(text),
            Ok(other) => {
                warn!("'{}' answered with the wrong shape: {:?}", action.name(), other);
                Reply::fell_back(fallback.to_string())
            }
            Err(_) => Reply::fell_back(fallback.to_string()),
        }
    }
}

#[async_trait]
impl LekhaApi for ClientFacade {
    async fn chat(&self, message: &str, observer: Option<RetryObserver<'_>>) -> Reply<String> {
        let action = Action::Chat(ChatPayload {
            message: message.to_string(),
        });
        let fallback = pick_chat_fallback();
        self.text_action(action, observer, fallback, CHAT_EMPTY).await
    }

    async fn analyze_style(&self, image_data: &str, observer: Option<RetryObserver<'_>>) -> Reply<String> {
        let action = Action::Analyze(AnalyzePayload {
            image_data: image_data.to_string(),
        });
        self.text_action(action, observer, ANALYZE_FALLBACK, ANALYZE_EMPTY).await
    }

    async fn generate_crazy_lekha(
        &self,
        prompt: &str,
        observer: Option<RetryObserver<'_>>,
    ) -> Reply<Option<String>> {
        let action = Action::Image(ImagePayload {
            prompt: prompt.to_string(),
        });
        match self.call(&action, observer).await {
            Ok(ActionData::Image { data_url }) => Reply::answered(data_url),
            Ok(other) => {
                warn!("'image' answered with the wrong shape: {:?}", other);
                Reply::fell_back(None)
            }
            Err(_) => Reply::fell_back(None),
        }
    }

    async fn get_lekha_quote(&self, observer: Option<RetryObserver<'_>>) -> Reply<String> {
        self.text_action(Action::Quote, observer, QUOTE_FALLBACK, QUOTE_EMPTY).await
    }
}
