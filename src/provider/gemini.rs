//! Gemini `generateContent` REST client

use super::{ContentPart, InlineImage, ModelProvider, ProviderFactory, SharedProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Public Gemini API root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used for conversation and photo critique
pub const TEXT_MODEL: &str = "gemini-2.5-flash-lite";

/// Model used for image generation
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Request body of `models/{model}:generateContent`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Persona instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// Conversation turns
    pub contents: Vec<Content>,
    /// Output options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// A turn of content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// `user` or `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Parts in order
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    fn instruction(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

/// Text or inline data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline(image: &InlineImage) -> Self {
        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            }),
        }
    }
}

/// Base64 blob
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// MIME type
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

/// Output options
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Requested output modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    /// Image options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

/// Image options
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// e.g. `1:1`
    pub aspect_ratio: String,
}

/// Response body of `generateContent`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    /// Candidates, best first
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One candidate answer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    /// Candidate content; absent when the answer was blocked
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    /// Parts of the first candidate in provider-neutral form
    pub fn parts(&self) -> Vec<ContentPart> {
        self.first_parts()
            .iter()
            .filter_map(|p| match (&p.inline_data, &p.text) {
                (Some(blob), _) => Some(ContentPart::InlineData(InlineImage {
                    mime_type: blob.mime_type.clone(),
                    data: blob.data.clone(),
                })),
                (None, Some(text)) => Some(ContentPart::Text(text.clone())),
                (None, None) => None,
            })
            .collect()
    }
}

/// Request for a single-turn conversation
pub fn converse_request(system_instruction: &str, message: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Some(Content::instruction(system_instruction)),
        contents: vec![Content::user(vec![Part::text(message)])],
        generation_config: None,
    }
}

/// Request for an image critique: the image part comes first
pub fn describe_image_request(
    system_instruction: &str,
    image: &InlineImage,
    prompt: &str,
) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Some(Content::instruction(system_instruction)),
        contents: vec![Content::user(vec![Part::inline(image), Part::text(prompt)])],
        generation_config: None,
    }
}

/// Request for image generation
pub fn generate_image_request(prompt: &str, aspect_ratio: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: None,
        contents: vec![Content::user(vec![Part::text(prompt)])],
        generation_config: Some(GenerationConfig {
            response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            image_config: Some(ImageConfig {
                aspect_ratio: aspect_ratio.to_string(),
            }),
        }),
    }
}

/// Mask an API key for logging: first 4 and last 4 characters
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Gemini provider bound to one API key
#[derive(Clone)]
pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl GeminiProvider {
    /// Create a provider against the public API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), DEFAULT_BASE_URL, api_key)
    }

    /// Create a provider sharing an HTTP client, against a custom API root
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            text_model: TEXT_MODEL.to_string(),
            image_model: IMAGE_MODEL.to_string(),
        }
    }

    /// Override the text/vision model
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Override the image model
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Endpoint URL for a model
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    #[instrument(skip(self, request), fields(api_key = %mask_key(&self.api_key)))]
    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        debug!("POST {}", self.endpoint(model));

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(
                "Gemini {} returned {}: {}",
                model,
                status,
                detail.chars().take(500).collect::<String>()
            );
            return Err(Error::Provider(format!("{} returned {}", model, status)));
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn converse(&self, system_instruction: &str, message: &str) -> Result<String> {
        let request = converse_request(system_instruction, message);
        Ok(self.generate(&self.text_model, &request).await?.text())
    }

    async fn describe_image(
        &self,
        system_instruction: &str,
        image: &InlineImage,
        prompt: &str,
    ) -> Result<String> {
        let request = describe_image_request(system_instruction, image, prompt);
        Ok(self.generate(&self.text_model, &request).await?.text())
    }

    async fn generate_image(&self, prompt: &str, aspect_ratio: &str) -> Result<Vec<ContentPart>> {
        let request = generate_image_request(prompt, aspect_ratio);
        Ok(self.generate(&self.image_model, &request).await?.parts())
    }
}

/// Builds [`GeminiProvider`]s that share one connection pool
#[derive(Clone)]
pub struct GeminiFactory {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiFactory {
    /// Factory for the given API root
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for GeminiFactory {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ProviderFactory for GeminiFactory {
    fn create(&self, api_key: &str) -> SharedProvider {
        Arc::new(GeminiProvider::with_client(
            self.http.clone(),
            self.base_url.clone(),
            api_key,
        ))
    }
}
