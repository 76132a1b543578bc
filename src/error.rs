//! Error types for the edgequake-docverify library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocVerifyError`] — **Fatal**: the document cannot be analysed at all
//!   (missing file, unsupported type, undecodable image, PDF without pages).
//!   Returned as `Err(DocVerifyError)` from the normaliser and the top-level
//!   `analyze*` functions.
//!
//! * [`StageError`] — **Non-fatal**: the extraction or validation stage
//!   failed (provider unreachable, reply not JSON, geocoder returned 4xx/5xx).
//!   Stored inside [`crate::output::ExtractionResult`] and
//!   [`crate::output::ValidationResult`] next to safe default values, so a
//!   caller can always render *something* without its own error handling.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-docverify library.
///
/// Stage-level failures use [`StageError`] and are stored in the result
/// records rather than propagated here.
#[derive(Debug, Error)]
pub enum DocVerifyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not one of the accepted document types.
    #[error("Unsupported file type '{file_name}': expected .jpg, .jpeg, .png or .pdf")]
    UnsupportedFileType { file_name: String },

    // ── Normalisation errors ──────────────────────────────────────────────
    /// The bytes could not be decoded as a raster image.
    #[error("Could not decode image '{file_name}': {detail}")]
    Decode { file_name: String, detail: String },

    /// The PDF opened fine but has no page to render.
    #[error("PDF '{file_name}' has no pages to render")]
    EmptyDocument { file_name: String },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{file_name}' is corrupt: {detail}")]
    CorruptPdf { file_name: String, detail: String },

    /// pdfium-render returned an error while rendering the first page.
    #[error("Rasterisation failed for '{file_name}': {detail}")]
    RasterisationFailed { file_name: String, detail: String },

    /// JPEG re-encoding failed.
    #[error("Failed to encode normalised image: {0}")]
    Encode(String),

    // ── Provider errors ───────────────────────────────────────────────────
    /// The named LLM provider could not be created (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF input needs the pdfium shared library. You can:\n\
  • Install libpdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium, or\n\
  • Pass --pdfium-lib /path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error captured by the extraction or validation stage.
///
/// Serialises as its display string so JSON reports carry the same
/// human-readable text the CLI prints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// The provider could not be reached, rejected the credentials, or
    /// answered with a non-success status.
    #[error("{provider} request failed: {detail}")]
    ProviderTransport { provider: String, detail: String },

    /// The model reply did not contain a parseable JSON object.
    #[error("Failed to parse response: {detail}")]
    ResponseParse { detail: String },

    /// The geocoder answered with a non-success status or an unusable body.
    #[error("Could not geocode address (HTTP {status}): {detail}")]
    GeocodeLookup { status: u16, detail: String },
}

impl serde::Serialize for StageError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
