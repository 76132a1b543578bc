//! Whole-document entry points.
//!
//! Runs the three stages in strict order for one document:
//!
//! ```text
//! normalize ──▶ extract ──▶ validate (only if an address was extracted)
//! ```
//!
//! Only input and normalisation problems are fatal. Extraction and validation
//! failures come back inside the report, next to safe defaults.

use crate::config::AnalyzerConfig;
use crate::credentials::Credentials;
use crate::error::DocVerifyError;
use crate::output::{AnalysisReport, AnalysisStats};
use crate::pipeline::extract::{extract_with, resolve_backend};
use crate::pipeline::geocode::validate;
use crate::pipeline::input::RawDocument;
use crate::pipeline::normalize::normalize;
use crate::progress::Stage;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Analyse one uploaded document.
///
/// # Errors
/// Returns `Err(DocVerifyError)` only for fatal errors:
/// - the image cannot be decoded, or the PDF is corrupt or has no pages
/// - pdfium cannot be bound for a PDF upload
/// - a named provider (`config.provider_name`) cannot be created
pub async fn analyze(
    document: RawDocument,
    credentials: &Credentials,
    config: &AnalyzerConfig,
) -> Result<AnalysisReport, DocVerifyError> {
    let total_start = Instant::now();
    let file_name = document.file_name().to_string();
    info!("Starting analysis: {}", file_name);

    let backend = resolve_backend(config)?;
    let progress = config.progress_callback.as_ref();

    // ── Step 1: Normalise ────────────────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Normalize);
    }
    let step = Instant::now();
    let image = normalize(document, config).await?;
    let normalize_duration_ms = step.elapsed().as_millis() as u64;
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Normalize, normalize_duration_ms);
    }

    let kind = image.kind();
    let (image_width, image_height, jpeg_bytes) = (image.width(), image.height(), image.len());

    // ── Step 2: Extract ──────────────────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Extract);
    }
    let step = Instant::now();
    let extraction = extract_with(backend.as_ref(), image, credentials, config).await;
    let extract_duration_ms = step.elapsed().as_millis() as u64;
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Extract, extract_duration_ms);
    }

    // ── Step 3: Validate ─────────────────────────────────────────────────
    let address = extraction.address().trim();
    let (validation, validate_duration_ms) = if address.is_empty() {
        warn!("No address extracted from '{}', skipping validation", file_name);
        if let Some(cb) = progress {
            cb.on_stage_skipped(Stage::Validate);
        }
        (None, 0)
    } else {
        if let Some(cb) = progress {
            cb.on_stage_start(Stage::Validate);
        }
        let step = Instant::now();
        let result = validate(address, credentials, config).await;
        let elapsed = step.elapsed().as_millis() as u64;
        if let Some(cb) = progress {
            cb.on_stage_complete(Stage::Validate, elapsed);
        }
        (Some(result), elapsed)
    };

    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Analysis of '{}' finished in {}ms (valid address: {})",
        file_name,
        total_duration_ms,
        validation.as_ref().is_some_and(|v| v.is_valid())
    );

    Ok(AnalysisReport {
        file_name,
        document: kind,
        extraction,
        validation,
        stats: AnalysisStats {
            image_width,
            image_height,
            jpeg_bytes,
            normalize_duration_ms,
            extract_duration_ms,
            validate_duration_ms,
            total_duration_ms,
        },
    })
}

/// Read a local `.jpg`/`.jpeg`/`.png`/`.pdf` file and analyse it.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    credentials: &Credentials,
    config: &AnalyzerConfig,
) -> Result<AnalysisReport, DocVerifyError> {
    let document = RawDocument::from_path(path)?;
    analyze(document, credentials, config).await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a new tokio runtime internally. Do not call from an async context.
pub fn analyze_sync(
    document: RawDocument,
    credentials: &Credentials,
    config: &AnalyzerConfig,
) -> Result<AnalysisReport, DocVerifyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocVerifyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(document, credentials, config))
}
