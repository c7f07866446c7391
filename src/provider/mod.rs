//! Generative model provider module
//!
//! The gateway treats the model vendor as a capability interface:
//! - `converse` - system instruction plus one user message, text back
//! - `describe_image` - system instruction, inline image and prompt, text back
//! - `generate_image` - prompt and aspect ratio, raw content parts back
//!
//! Vendor request/response shapes stay inside the implementation
//! (see [`gemini`]).

pub mod gemini;

use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use gemini::{GeminiFactory, GeminiProvider};

/// Inline binary content, base64 encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

impl InlineImage {
    /// JPEG image from base64 data
    pub fn jpeg(data: impl Into<String>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data: data.into(),
        }
    }
}

/// One part of a model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text
    Text(String),
    /// Inline binary data
    InlineData(InlineImage),
}

/// Capabilities the gateway needs from a model vendor
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Single-turn conversation
    async fn converse(&self, system_instruction: &str, message: &str) -> Result<String>;

    /// Multimodal call with one inline image followed by a text prompt
    async fn describe_image(
        &self,
        system_instruction: &str,
        image: &InlineImage,
        prompt: &str,
    ) -> Result<String>;

    /// Image generation; returns every part of the first candidate
    async fn generate_image(&self, prompt: &str, aspect_ratio: &str) -> Result<Vec<ContentPart>>;
}

/// Provider shared across the attempts of one request
pub type SharedProvider = Arc<dyn ModelProvider>;

/// Builds a provider for a credential.
///
/// The gateway resolves the credential per request and asks the factory for a
/// provider only once one is present.
pub trait ProviderFactory: Send + Sync {
    /// Provider authorised with `api_key`
    fn create(&self, api_key: &str) -> SharedProvider;
}

impl<F> ProviderFactory for F
where
    F: Fn(&str) -> SharedProvider + Send + Sync,
{
    fn create(&self, api_key: &str) -> SharedProvider {
        self(api_key)
    }
}
