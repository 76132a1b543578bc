//! Extraction stage: one vision request per document.
//!
//! The stage always returns an [`ExtractionResult`]. Transport failures, auth
//! failures and unparseable replies are recorded in its `error` field next to
//! empty defaults, so a bad reply never aborts the run. Nothing is retried.

use crate::backend::{LlmProviderBackend, OpenAiChatBackend, VisionBackend, VisionRequest};
use crate::config::AnalyzerConfig;
use crate::credentials::Credentials;
use crate::error::{DocVerifyError, StageError};
use crate::output::{ExtractionResult, NormalizedImage};
use crate::pipeline::coerce::coerce_reply;
use crate::pipeline::encode::encode_image;
use crate::prompts::EXTRACTION_PROMPT;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pick the backend for this config, from most to least specific:
///
/// 1. a pre-built `config.backend`;
/// 2. a named edgequake-llm provider (`config.provider_name`);
/// 3. the OpenAI-compatible HTTP backend at `config.extraction_base_url`.
pub fn resolve_backend(config: &AnalyzerConfig) -> Result<Arc<dyn VisionBackend>, DocVerifyError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref name) = config.provider_name {
        let backend = LlmProviderBackend::from_provider_name(name, &config.model)?;
        return Ok(Arc::new(backend));
    }

    let client = config
        .http_client()
        .map_err(|e| DocVerifyError::Internal(format!("HTTP client: {e}")))?;
    Ok(Arc::new(OpenAiChatBackend::new(
        client,
        config.extraction_base_url.as_str(),
    )))
}

/// Extract the identity fields from a normalised image.
///
/// Resolves the backend from `config` first; a backend that cannot be
/// created is reported like any other transport failure.
pub async fn extract(
    image: NormalizedImage,
    credentials: &Credentials,
    config: &AnalyzerConfig,
) -> ExtractionResult {
    match resolve_backend(config) {
        Ok(backend) => extract_with(backend.as_ref(), image, credentials, config).await,
        Err(e) => {
            let err = StageError::ProviderTransport {
                provider: config
                    .provider_name
                    .clone()
                    .unwrap_or_else(|| "openai".to_string()),
                detail: e.to_string(),
            };
            warn!("Extraction skipped: {}", err);
            ExtractionResult::failed(err)
        }
    }
}

/// Extract with an already-resolved backend.
pub async fn extract_with(
    backend: &dyn VisionBackend,
    image: NormalizedImage,
    credentials: &Credentials,
    config: &AnalyzerConfig,
) -> ExtractionResult {
    let start = Instant::now();
    let prompt = config
        .extraction_prompt
        .as_deref()
        .unwrap_or(EXTRACTION_PROMPT);

    let (width, height) = (image.width(), image.height());
    let encoded = encode_image(image);
    info!(
        "Extracting fields via {} ({}, {}x{} image)",
        backend.name(),
        config.model,
        width,
        height
    );

    let request = VisionRequest {
        model: &config.model,
        prompt,
        image: &encoded,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        api_key: credentials.extraction_api_key(),
    };

    let outcome = backend
        .complete(request)
        .await
        .and_then(|reply| coerce_reply(&reply));
    debug!("Extraction finished in {:?}", start.elapsed());

    match outcome {
        Ok(result) => result,
        Err(err) => {
            warn!("Extraction failed: {}", err);
            ExtractionResult::failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ColorMode, DocumentKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend returning a canned reply and recording what it was sent.
    struct Canned {
        reply: Result<String, StageError>,
        seen: Mutex<Vec<(String, String, String)>>,
    }

    impl Canned {
        fn new(reply: Result<String, StageError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VisionBackend for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: VisionRequest<'_>) -> Result<String, StageError> {
            self.seen.lock().unwrap().push((
                request.prompt.to_string(),
                request.api_key.to_string(),
                request.image.data_uri(),
            ));
            self.reply.clone()
        }
    }

    fn image() -> NormalizedImage {
        NormalizedImage::new(vec![0xFF, 0xD8, 0xFF], 1, 1, ColorMode::Rgb, DocumentKind::Raster)
    }

    #[tokio::test]
    async fn fenced_reply_is_coerced() {
        let backend = Canned::new(Ok(
            "```json\n{\"is_bank_statement\": false, \"name\": \"Jane Doe\", \"address\": \"1 Main St\", \"document_date\": \"2024-01-31\"}\n```".into(),
        ));
        let creds = Credentials::new("sk-test", "geo");
        let r = extract_with(&backend, image(), &creds, &AnalyzerConfig::default()).await;
        assert!(r.error().is_none());
        assert_eq!(r.name(), "Jane Doe");
        assert_eq!(r.address(), "1 Main St");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "exactly one request");
        assert_eq!(seen[0].0, EXTRACTION_PROMPT);
        assert_eq!(seen[0].1, "sk-test");
        assert_eq!(seen[0].2, "data:image/jpeg;base64,/9j/");
    }

    #[tokio::test]
    async fn transport_failure_yields_empty_record() {
        let backend = Canned::new(Err(StageError::ProviderTransport {
            provider: "canned".into(),
            detail: "HTTP 401: Incorrect API key provided".into(),
        }));
        let r = extract_with(&backend, image(), &Credentials::default(), &AnalyzerConfig::default()).await;
        assert_eq!(r.name(), "");
        assert!(!r.is_bank_statement());
        assert!(matches!(r.error(), Some(StageError::ProviderTransport { .. })));
    }

    #[tokio::test]
    async fn prompt_override_is_sent() {
        let backend = Canned::new(Ok("{}".into()));
        let config = AnalyzerConfig::builder()
            .extraction_prompt("Only JSON please")
            .build()
            .unwrap();
        let r = extract_with(&backend, image(), &Credentials::default(), &config).await;
        assert!(r.error().is_none());
        assert_eq!(backend.seen.lock().unwrap()[0].0, "Only JSON please");
    }

    #[tokio::test]
    async fn configured_backend_takes_precedence() {
        let backend = Arc::new(Canned::new(Ok("{\"name\": \"Pre-built\"}".into())));
        let config = AnalyzerConfig::builder()
            .backend(backend.clone())
            .provider_name("no-such-provider")
            .build()
            .unwrap();
        let r = extract(image(), &Credentials::default(), &config).await;
        assert_eq!(r.name(), "Pre-built");
    }
}
