//! Input resolution: turn a user-supplied file into a [`RawDocument`].
//!
//! The accepted surface is one file per run, restricted to JPG, PNG and PDF.
//! The check is by extension, the same way an upload widget filters files;
//! the normaliser then decides between the raster and PDF paths.

use crate::config::PdfDetection;
use crate::error::DocVerifyError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted by [`RawDocument::from_path`].
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// An uploaded document: opaque bytes plus the filename it arrived with.
#[derive(Clone)]
pub struct RawDocument {
    bytes: Vec<u8>,
    file_name: String,
}

impl RawDocument {
    /// Wrap bytes that already live in memory (e.g. a multipart upload).
    pub fn new(bytes: impl Into<Vec<u8>>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
        }
    }

    /// Read a local file, enforcing the supported extensions.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocVerifyError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !has_supported_extension(&file_name) {
            return Err(DocVerifyError::UnsupportedFileType { file_name });
        }

        let bytes = std::fs::read(path).map_err(|e| map_read_error(path, e))?;
        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { bytes, file_name })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Whether this upload goes down the PDF path.
    pub fn is_pdf(&self, detection: PdfDetection) -> bool {
        match detection {
            PdfDetection::NameOnly => has_pdf_name(&self.file_name),
            PdfDetection::NameOrMagic => {
                has_pdf_name(&self.file_name) || self.bytes.starts_with(b"%PDF-")
            }
        }
    }
}

impl std::fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDocument")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Case-insensitive `.pdf` suffix check.
pub fn has_pdf_name(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".pdf")
}

fn has_supported_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn map_read_error(path: &Path, e: std::io::Error) -> DocVerifyError {
    let path = PathBuf::from(path);
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => DocVerifyError::PermissionDenied { path },
        _ => DocVerifyError::FileNotFound { path },
    }
}
