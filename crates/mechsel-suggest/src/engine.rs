use std::time::Duration;

use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ImageMime};

use mechsel_core::config::AiSettings;

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("model call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("model error: {0}")]
    Model(String),
    #[error("failed to build prompt: {0}")]
    Prompt(#[from] serde_json::Error),
}

/// Image formats the model accepts as an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Map a MIME type (parameters ignored) to an image kind.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    fn mime(self) -> ImageMime {
        match self {
            ImageKind::Jpeg => ImageMime::JPEG,
            ImageKind::Png => ImageMime::PNG,
            ImageKind::Gif => ImageMime::GIF,
            ImageKind::Webp => ImageMime::WEBP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    /// Attachment typed from a declared MIME type, or `fallback` when the
    /// type is missing or not an accepted image format.
    pub fn from_mime(bytes: Vec<u8>, mime: Option<&str>, fallback: ImageKind) -> Self {
        let kind = mime.and_then(ImageKind::from_mime).unwrap_or(fallback);
        Self { kind, bytes }
    }
}

/// One prompt, optionally with one image.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    pub image: Option<ImageAttachment>,
}

impl ModelRequest {
    pub fn text(prompt: String) -> Self {
        Self {
            prompt,
            image: None,
        }
    }

    pub fn with_image(prompt: String, image: ImageAttachment) -> Self {
        Self {
            prompt,
            image: Some(image),
        }
    }
}

/// A generative model behind a single-attempt call.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Identifier of the model requests are sent to.
    fn model(&self) -> &str;

    async fn generate(&self, request: ModelRequest) -> Result<String, InvokeError>;
}

fn map_backend(provider: &str) -> Result<LLMBackend, String> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(format!("unknown provider: {other}")),
    }
}

/// Model invoker backed by the `llm` crate.
///
/// Settings are checked once at construction; the provider client itself is
/// cheap to build and is created per call.
#[derive(Clone)]
pub struct LlmInvoker {
    settings: AiSettings,
    timeout: Duration,
}

impl std::fmt::Debug for LlmInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmInvoker")
            .field("provider", &self.settings.provider)
            .field("model", &self.settings.model)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmInvoker {
    pub fn new(settings: AiSettings, timeout: Duration) -> Result<Self, InvokeError> {
        map_backend(&settings.provider).map_err(InvokeError::Unavailable)?;
        if !mechsel_core::config::ai_configured(&settings) {
            return Err(InvokeError::Unavailable(format!(
                "provider '{}' needs an API key and a model",
                settings.provider
            )));
        }
        Ok(Self { settings, timeout })
    }

    async fn call(&self, request: ModelRequest) -> Result<String, InvokeError> {
        let backend = map_backend(&self.settings.provider).map_err(InvokeError::Unavailable)?;

        let mut builder = LLMBuilder::new().backend(backend).model(&self.settings.model);

        if !self.settings.api_key.is_empty() {
            builder = builder.api_key(&self.settings.api_key);
        }

        let llm = builder
            .build()
            .map_err(|e| InvokeError::Unavailable(format!("build LLM: {e}")))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(image) = request.image {
            messages.push(
                ChatMessage::user()
                    .image(image.kind.mime(), image.bytes)
                    .build(),
            );
        }
        messages.push(ChatMessage::user().content(request.prompt).build());

        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| InvokeError::Model(format!("chat: {e}")))?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(InvokeError::Model("LLM returned empty text".to_string())),
            None => Err(InvokeError::Model("LLM returned no text".to_string())),
        }
    }
}

#[async_trait]
impl ModelInvoker for LlmInvoker {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, request: ModelRequest) -> Result<String, InvokeError> {
        tokio::time::timeout(self.timeout, self.call(request))
            .await
            .map_err(|_| InvokeError::Timeout(self.timeout))?
    }
}
