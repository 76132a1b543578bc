//! Configuration types for document analysis.
//!
//! All analysis behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. Credentials are deliberately *not* part of
//! the config: they are passed to each call as [`crate::Credentials`].
//!
//! The two policy constants of the pipeline, the 300 DPI rasterisation
//! density and the 0.8 address-confidence threshold, are defaults here
//! rather than literals in the stages.

use crate::backend::VisionBackend;
use crate::error::DocVerifyError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default OpenAI-compatible API root used by [`crate::backend::OpenAiChatBackend`].
pub const DEFAULT_EXTRACTION_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Geoapify forward-geocoding endpoint.
pub const DEFAULT_GEOCODE_URL: &str = "https://api.geoapify.com/v1/geocode/search";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for a document analysis run.
///
/// Built via [`AnalyzerConfig::builder()`] or using
/// [`AnalyzerConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_docverify::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .dpi(200)
///     .confidence_threshold(0.9)
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    // ── Normalisation ────────────────────────────────────────────────────
    /// Rendering DPI for the first page of a PDF. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Cap on either edge of the rendered PDF page, in pixels. Default: 6000.
    ///
    /// A letter page at 300 DPI is 2550 × 3300 px and is unaffected. The cap
    /// only bites on oversized pages (posters, plans) that would otherwise
    /// allocate hundreds of megabytes.
    pub max_rendered_pixels: u32,

    /// JPEG quality of the normalised image. Range: 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// How a PDF upload is recognised. Default: [`PdfDetection::NameOrMagic`].
    pub pdf_detection: PdfDetection,

    /// Directory for the PDF scratch file. Default: the system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// Explicit pdfium shared library. Falls back to `PDFIUM_LIB_PATH`, then
    /// to the system library.
    pub pdfium_library: Option<PathBuf>,

    // ── Extraction ───────────────────────────────────────────────────────
    /// Vision model identifier. Default: `gpt-4o`.
    pub model: String,

    /// API root of the OpenAI-compatible chat endpoint.
    pub extraction_base_url: String,

    /// Named edgequake-llm provider (e.g. "anthropic", "gemini", "ollama").
    /// When set, extraction goes through [`crate::backend::LlmProviderBackend`]
    /// and that provider's own environment credentials.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn VisionBackend>>,

    /// Sampling temperature. Default: 0.0 for deterministic extraction.
    pub temperature: f32,

    /// Output-token budget for the model reply. Default: 1024.
    pub max_tokens: usize,

    /// Replacement for the built-in extraction prompt.
    pub extraction_prompt: Option<String>,

    // ── Validation ───────────────────────────────────────────────────────
    /// Forward-geocoding search endpoint.
    pub geocode_url: String,

    /// Minimum geocoder confidence for an address to count as valid.
    /// Range: 0.0–1.0. Default: 0.8.
    pub confidence_threshold: f64,

    // ── Transport ────────────────────────────────────────────────────────
    /// Per-request HTTP timeout in seconds. Default: none (client default).
    pub api_timeout_secs: Option<u64>,

    /// Pre-built HTTP client shared by both providers.
    pub http_client: Option<reqwest::Client>,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 6000,
            jpeg_quality: 95,
            pdf_detection: PdfDetection::default(),
            scratch_dir: None,
            pdfium_library: None,
            model: DEFAULT_MODEL.to_string(),
            extraction_base_url: DEFAULT_EXTRACTION_BASE_URL.to_string(),
            provider_name: None,
            backend: None,
            temperature: 0.0,
            max_tokens: 1024,
            extraction_prompt: None,
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
            confidence_threshold: 0.8,
            api_timeout_secs: None,
            http_client: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("pdf_detection", &self.pdf_detection)
            .field("scratch_dir", &self.scratch_dir)
            .field("pdfium_library", &self.pdfium_library)
            .field("model", &self.model)
            .field("extraction_base_url", &self.extraction_base_url)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("geocode_url", &self.geocode_url)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Options the normaliser needs, detached from the rest of the config so
    /// they can be moved into a blocking task.
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            dpi: self.dpi,
            max_rendered_pixels: self.max_rendered_pixels,
            jpeg_quality: self.jpeg_quality,
            pdf_detection: self.pdf_detection,
            scratch_dir: self.scratch_dir.clone(),
            pdfium_library: self.pdfium_library.clone(),
        }
    }

    /// The configured HTTP client, or a fresh one honouring `api_timeout_secs`.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        if let Some(ref client) = self.http_client {
            return Ok(client.clone());
        }
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.api_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        builder.build()
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn pdf_detection(mut self, mode: PdfDetection) -> Self {
        self.config.pdf_detection = mode;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn extraction_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.extraction_base_url = url.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn VisionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn geocode_url(mut self, url: impl Into<String>) -> Self {
        self.config.geocode_url = url.into();
        self
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.config.http_client = Some(client);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, DocVerifyError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.confidence_threshold) {
            return Err(DocVerifyError::InvalidConfig(format!(
                "Confidence threshold must be 0.0–1.0, got {}",
                c.confidence_threshold
            )));
        }
        if c.max_tokens == 0 {
            return Err(DocVerifyError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(DocVerifyError::InvalidConfig("Model must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Normaliser options ───────────────────────────────────────────────────

/// How an upload is recognised as a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PdfDetection {
    /// Case-insensitive `.pdf` filename suffix only.
    NameOnly,
    /// `.pdf` suffix, or content starting with the `%PDF-` signature. (default)
    #[default]
    NameOrMagic,
}

/// The subset of [`AnalyzerConfig`] used by the normaliser.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub jpeg_quality: u8,
    pub pdf_detection: PdfDetection,
    pub scratch_dir: Option<PathBuf>,
    pub pdfium_library: Option<PathBuf>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        AnalyzerConfig::default().normalize_options()
    }
}
