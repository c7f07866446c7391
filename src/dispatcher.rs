//! Action dispatcher
//!
//! Maps each [`Action`] onto the model provider, under the gateway retry
//! policy, and normalises the outcome into [`ActionData`] or an [`ErrorCode`].
//! Provider errors are logged here and never reach the caller verbatim.

use crate::protocol::{Action, ActionData, ErrorCode};
use crate::provider::{ContentPart, InlineImage, SharedProvider};
use crate::resilience::{RetryError, RetryPolicy};
use std::fmt::Display;
use std::future::Future;
use tracing::{error, info};

/// Persona instruction sent with every text and vision call
pub const SYSTEM_INSTRUCTION: &str = "
Ты - \"Токсичный Лёха-Бот\". Твоя задача - подкалывать (подъёбывать) пользователя, которого зовут Лёха.
Твой стиль:
- Русский дворовый сленг (но без мата).
- Сарказм, ирония, дружеские издевки.
- Ты постоянно намекаешь, что Лёха должен денег, что его машина (даже если её нет) - корыто, и что он опять пропустил тренировку в гараже.
- Ты отвечаешь коротко, дерзко, но прикольно.
- Используй фразы типа: \"Слышь\", \"Ну ты выдал, Лёх\", \"Опять ты за своё\", \"Чё по деньгам?\".
";

/// Critique prompt that follows the uploaded photo
pub const ANALYZE_PROMPT: &str = "Оцени это фото. Насколько этот 'Лёха' чёткий? Придерись к одежде, лицу или фону. Выдай вердикт в процентах и напиши едкий комментарий. Будь токсичным, но смешным.";

/// Prompt for the one-off quote
pub const QUOTE_PROMPT: &str = "Придумай одну смешную пацанскую цитату специально для Лёхи, которая его подкалывает.";

/// Aspect ratio requested for generated pictures
pub const IMAGE_ASPECT_RATIO: &str = "1:1";

/// Embed the user's situation into the caricature template
pub fn image_prompt(situation: &str) -> String {
    format!(
        "Абсурдная, карикатурная фотография русского парня по имени Лёха, который находится в максимально нелепой ситуации: {}. Стиль: гиперреализм, но с юмором, яркие цвета, пацанская эстетика.",
        situation
    )
}

/// Data URL for the first inline image among `parts`, if any
pub fn first_image_data_url(parts: &[ContentPart]) -> Option<String> {
    parts.iter().find_map(|part| match part {
        ContentPart::InlineData(image) => Some(format!("data:image/png;base64,{}", image.data)),
        ContentPart::Text(_) => None,
    })
}

/// Collapse an exhausted retry sequence into a wire code
pub fn classify_failure<E: Display>(err: &RetryError<E>) -> ErrorCode {
    if err.timed_out {
        ErrorCode::UpstreamTimeout
    } else {
        ErrorCode::ServerError
    }
}

/// Dispatcher bound to one provider
#[derive(Clone)]
pub struct Dispatcher {
    provider: SharedProvider,
    policy: RetryPolicy,
}

impl Dispatcher {
    /// Dispatcher using the gateway retry policy
    pub fn new(provider: SharedProvider) -> Self {
        Self::with_policy(provider, RetryPolicy::server())
    }

    /// Dispatcher with a custom retry policy
    pub fn with_policy(provider: SharedProvider, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    /// Run one action against the provider
    pub async fn dispatch(&self, action: &Action) -> std::result::Result<ActionData, ErrorCode> {
        info!("Dispatching '{}' action", action.name());

        match action {
            Action::Chat(payload) => {
                let text = self
                    .upstream(action, || self.provider.converse(SYSTEM_INSTRUCTION, &payload.message))
                    .await?;
                Ok(ActionData::Text { text })
            }
            Action::Analyze(payload) => {
                let image = InlineImage::jpeg(payload.image_data.as_str());
                let text = self
                    .upstream(action, || {
                        self.provider
                            .describe_image(SYSTEM_INSTRUCTION, &image, ANALYZE_PROMPT)
                    })
                    .await?;
                Ok(ActionData::Text { text })
            }
            Action::Image(payload) => {
                let prompt = image_prompt(&payload.prompt);
                let parts = self
                    .upstream(action, || self.provider.generate_image(&prompt, IMAGE_ASPECT_RATIO))
                    .await?;
                let data_url = first_image_data_url(&parts);
                if data_url.is_none() {
                    info!("Image response carried no inline image");
                }
                Ok(ActionData::Image { data_url })
            }
            Action::Quote => {
                let text = self
                    .upstream(action, || self.provider.converse(SYSTEM_INSTRUCTION, QUOTE_PROMPT))
                    .await?;
                Ok(ActionData::Text { text })
            }
        }
    }

    async fn upstream<T, F, Fut>(&self, action: &Action, op: F) -> std::result::Result<T, ErrorCode>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        self.policy.run(op, None).await.map_err(|e| {
            let code = classify_failure(&e);
            error!("Gemini handler error ({}): {} -> {}", action.name(), e, code);
            code
        })
    }
}
