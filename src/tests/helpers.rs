//! Scripted fakes shared by the test modules

use crate::client::{LekhaApi, Reply};
use crate::config::{CredentialSource, ServerConfig};
use crate::provider::{ContentPart, InlineImage, ModelProvider, ProviderFactory, SharedProvider};
use crate::resilience::{RetryObserver, RetryPolicy};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Converse { system: String, message: String },
    Describe { system: String, image: InlineImage, prompt: String },
    Generate { prompt: String, aspect_ratio: String },
}

/// Provider that fails a fixed number of times, then answers
pub struct FakeProvider {
    calls: AtomicUsize,
    failures: usize,
    delay: Option<Duration>,
    text: String,
    parts: Vec<ContentPart>,
    log: Mutex<Vec<ProviderCall>>,
}

impl FakeProvider {
    pub fn answering(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures: 0,
            delay: None,
            text: text.to_string(),
            parts: Vec::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing_first(usize::MAX)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_parts(mut self, parts: Vec<ContentPart>) -> Self {
        self.parts = parts;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<ProviderCall> {
        self.log.lock().expect("Failed to lock call log").clone()
    }

    async fn attempt(&self, call: ProviderCall) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().expect("Failed to lock call log").push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if n <= self.failures {
            return Err(Error::Provider(format!("scripted failure #{}", n)));
        }
        Ok(())
    }
}

#[async_trait]
impl ModelProvider for FakeProvider {
    async fn converse(&self, system_instruction: &str, message: &str) -> Result<String> {
        self.attempt(ProviderCall::Converse {
            system: system_instruction.to_string(),
            message: message.to_string(),
        })
        .await?;
        Ok(self.text.clone())
    }

    async fn describe_image(
        &self,
        system_instruction: &str,
        image: &InlineImage,
        prompt: &str,
    ) -> Result<String> {
        self.attempt(ProviderCall::Describe {
            system: system_instruction.to_string(),
            image: image.clone(),
            prompt: prompt.to_string(),
        })
        .await?;
        Ok(self.text.clone())
    }

    async fn generate_image(&self, prompt: &str, aspect_ratio: &str) -> Result<Vec<ContentPart>> {
        self.attempt(ProviderCall::Generate {
            prompt: prompt.to_string(),
            aspect_ratio: aspect_ratio.to_string(),
        })
        .await?;
        Ok(self.parts.clone())
    }
}

/// Factory that always hands out the same fake and remembers the keys it saw
pub struct FixedFactory {
    provider: Arc<FakeProvider>,
    keys: Mutex<Vec<String>>,
}

impl FixedFactory {
    pub fn new(provider: Arc<FakeProvider>) -> Self {
        Self {
            provider,
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().expect("Failed to lock key log").clone()
    }
}

impl ProviderFactory for FixedFactory {
    fn create(&self, api_key: &str) -> SharedProvider {
        self.keys
            .lock()
            .expect("Failed to lock key log")
            .push(api_key.to_string());
        self.provider.clone()
    }
}

/// Retry policy with short delays for tests
pub fn fast_server_policy() -> RetryPolicy {
    RetryPolicy::server()
        .with_backoff_unit(Duration::from_millis(5))
        .with_timeout(Duration::from_millis(500))
}

/// Loopback gateway configuration with a fixed credential
pub fn test_server_config(api_key: Option<&str>) -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".parse().expect("Failed to parse address"),
        credentials: CredentialSource::Fixed(api_key.map(str::to_string)),
        retry: fast_server_policy(),
        ..ServerConfig::default()
    }
}

/// Client API that returns canned replies and counts calls
pub struct FakeApi {
    calls: AtomicUsize,
    reply: Reply<String>,
    picture: Reply<Option<String>>,
    retries_to_report: u32,
}

impl FakeApi {
    pub fn new(reply: Reply<String>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply,
            picture: Reply::answered(None),
            retries_to_report: 0,
        }
    }

    pub fn with_picture(mut self, picture: Reply<Option<String>>) -> Self {
        self.picture = picture;
        self
    }

    pub fn reporting_retries(mut self, retries: u32) -> Self {
        self.retries_to_report = retries;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, observer: Option<RetryObserver<'_>>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(observer) = observer {
            for attempt in 1..=self.retries_to_report {
                observer(attempt);
            }
        }
    }
}

#[async_trait]
impl LekhaApi for FakeApi {
    async fn chat(&self, _message: &str, observer: Option<RetryObserver<'_>>) -> Reply<String> {
        self.record(observer);
        self.reply.clone()
    }

    async fn analyze_style(&self, _image_data: &str, observer: Option<RetryObserver<'_>>) -> Reply<String> {
        self.record(observer);
        self.reply.clone()
    }

    async fn generate_crazy_lekha(
        &self,
        _prompt: &str,
        observer: Option<RetryObserver<'_>>,
    ) -> Reply<Option<String>> {
        self.record(observer);
        self.picture.clone()
    }

    async fn get_lekha_quote(&self, observer: Option<RetryObserver<'_>>) -> Reply<String> {
        self.record(observer);
        self.reply.clone()
    }
}
