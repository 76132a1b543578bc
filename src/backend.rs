//! Vision backends: the seam between the extraction stage and a VLM.
//!
//! [`VisionBackend`] takes one prompt plus one image and returns the model's
//! raw text. Two implementations ship with the crate:
//!
//! * [`OpenAiChatBackend`] — talks to any OpenAI-compatible
//!   `/chat/completions` endpoint with `reqwest`, authenticating with the key
//!   carried in the request. This is the default.
//! * [`LlmProviderBackend`] — wraps an `edgequake_llm::LLMProvider`, so
//!   Anthropic, Gemini, Ollama and friends work too. Those providers read
//!   their keys from their own environment variables.
//!
//! Backends never retry. A failed call is reported once as a [`StageError`]
//! and the extraction stage turns it into an empty record.

use crate::error::{DocVerifyError, StageError};
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// One extraction request, borrowed from the caller for the duration of the call.
pub struct VisionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub image: &'a EncodedImage,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Per-call key. Backends that authenticate elsewhere ignore it.
    pub api_key: &'a str,
}

/// A vision-capable chat model.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Short provider label used in errors and logs.
    fn name(&self) -> &str;

    /// Send the prompt and image; return the reply text.
    async fn complete(&self, request: VisionRequest<'_>) -> Result<String, StageError>;
}

// ── OpenAI-compatible HTTP backend ───────────────────────────────────────

/// Direct `reqwest` client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiChatBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiChatBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn transport_error(&self, detail: impl Into<String>) -> StageError {
        StageError::ProviderTransport {
            provider: self.name().to_string(),
            detail: detail.into(),
        }
    }
}

/// JSON body of a single-turn vision chat completion.
pub fn chat_request_body(request: &VisionRequest<'_>) -> Value {
    json!({
        "model": request.model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": request.prompt },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": request.image.data_uri(),
                        "detail": request.image.detail,
                    }
                }
            ]
        }],
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
    })
}

/// Pull `error.message` out of an OpenAI-style error body, else the raw text.
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl VisionBackend for OpenAiChatBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: VisionRequest<'_>) -> Result<String, StageError> {
        if request.api_key.is_empty() {
            return Err(self.transport_error("no API key supplied"));
        }

        let body = chat_request_body(&request);
        debug!("POST {} (model {})", self.endpoint(), request.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.transport_error(format!(
                "HTTP {}: {}",
                status.as_u16(),
                provider_error_message(&text)
            )));
        }

        let completion: ChatCompletion =
            response.json().await.map_err(|e| StageError::ResponseParse {
                detail: format!("malformed chat completion: {e}"),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| StageError::ResponseParse {
                detail: "chat completion has no message content".into(),
            })
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapter over any `edgequake_llm` provider.
pub struct LlmProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl LlmProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    /// Instantiate a named provider (e.g. "anthropic") with the given model.
    ///
    /// The provider's API key is read from its usual environment variable.
    pub fn from_provider_name(name: &str, model: &str) -> Result<Self, DocVerifyError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            DocVerifyError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, name))
    }
}

#[async_trait]
impl VisionBackend for LlmProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: VisionRequest<'_>) -> Result<String, StageError> {
        let image = ImageData::new(request.image.base64.clone(), request.image.mime_type)
            .with_detail(request.image.detail);
        let messages = vec![ChatMessage::user_with_images(request.prompt, vec![image])];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| StageError::ProviderTransport {
                provider: self.label.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}
