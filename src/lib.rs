//! # edgequake-docverify
//!
//! Read identity fields off a scanned document with a Vision Language Model,
//! then check the extracted address against a geocoder.
//!
//! ## Why this crate?
//!
//! Proof-of-address checks usually end with a person squinting at a utility
//! bill. This crate hands that first pass to a VLM: it reads the holder's
//! name, address and document date, says whether the upload is a bank
//! statement, and asks a geocoding service how confident it is that the
//! address exists.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (.jpg / .png / .pdf)
//!  │
//!  ├─ 1. Normalise  decode or render page 1 via pdfium → JPEG (spawn_blocking)
//!  ├─ 2. Extract    one vision request → fixed four-field record
//!  ├─ 3. Validate   forward geocode → confidence in [0, 1] vs. threshold
//!  └─ 4. Report     fields + verdict + per-stage timings
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docverify::{analyze_file, AnalyzerConfig, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new(
//!         std::env::var("OPENAI_API_KEY")?,
//!         std::env::var("GEOAPIFY_API_KEY")?,
//!     );
//!     let config = AnalyzerConfig::default();
//!     let report = analyze_file("statement.pdf", &credentials, &config).await?;
//!
//!     println!("name:    {}", report.extraction.name());
//!     println!("address: {}", report.extraction.address());
//!     if let Some(v) = &report.validation {
//!         println!("valid:   {} ({:.0}%)", v.is_valid(), v.confidence() * 100.0);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docverify` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docverify = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDF support
//!
//! PDF uploads need the pdfium shared library at runtime. It is looked up at
//! [`AnalyzerConfig::pdfium_library`], then `PDFIUM_LIB_PATH`, then the
//! system library path. Image uploads never touch pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_file, analyze_sync};
pub use backend::{LlmProviderBackend, OpenAiChatBackend, VisionBackend, VisionRequest};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, NormalizeOptions, PdfDetection};
pub use credentials::Credentials;
pub use error::{DocVerifyError, StageError};
pub use output::{
    AnalysisReport, AnalysisStats, ColorMode, DocumentKind, ExtractionResult, GeocodeMatch,
    NormalizedImage, ValidationResult,
};
pub use pipeline::extract::extract;
pub use pipeline::geocode::validate;
pub use pipeline::input::RawDocument;
pub use pipeline::normalize::normalize;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
