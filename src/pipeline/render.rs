//! PDF rasterisation: render the first page of an uploaded PDF via pdfium.
//!
//! pdfium wants a file-system path, so the upload is written to a scratch
//! [`NamedTempFile`] first. The scratch file is declared before everything
//! that borrows pdfium, which makes it the last value dropped: the document
//! is closed before the file is unlinked, on the success path and on every
//! early `?` return alike.
//!
//! Only page 1 is ever loaded into a bitmap; the remaining pages are counted
//! but never touched.

use crate::config::NormalizeOptions;
use crate::error::DocVerifyError;
use crate::pipeline::input::RawDocument;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// PDF points per inch; pdfium page sizes are expressed in points.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterise page 1 of `doc`. Returns the image and the document's page count.
///
/// Blocking: call from `spawn_blocking` inside async code.
pub fn render_first_page(
    doc: &RawDocument,
    opts: &NormalizeOptions,
) -> Result<(DynamicImage, usize), DocVerifyError> {
    let scratch = write_scratch_file(doc.bytes(), opts.scratch_dir.as_deref())?;
    let pdfium = bind_pdfium(opts.pdfium_library.as_deref())?;

    let document = pdfium
        .load_pdf_from_file(scratch.path(), None)
        .map_err(|e| DocVerifyError::CorruptPdf {
            file_name: doc.file_name().to_string(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, rendering page 1", total_pages);

    ensure_has_pages(total_pages, doc.file_name())?;

    let page = pages
        .get(0)
        .map_err(|e| DocVerifyError::RasterisationFailed {
            file_name: doc.file_name().to_string(),
            detail: format!("{:?}", e),
        })?;

    let max_pixels = opts.max_rendered_pixels as i32;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(opts.dpi as f32 / POINTS_PER_INCH)
        .set_maximum_width(max_pixels)
        .set_maximum_height(max_pixels);

    let bitmap = page.render_with_config(&render_config).map_err(|e| {
        DocVerifyError::RasterisationFailed {
            file_name: doc.file_name().to_string(),
            detail: format!("{:?}", e),
        }
    })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page 1 at {} DPI → {}x{} px",
        opts.dpi,
        image.width(),
        image.height()
    );

    Ok((image, total_pages))
}

fn ensure_has_pages(page_count: usize, file_name: &str) -> Result<(), DocVerifyError> {
    if page_count == 0 {
        return Err(DocVerifyError::EmptyDocument {
            file_name: file_name.to_string(),
        });
    }
    Ok(())
}

/// Bind pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the system library.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, DocVerifyError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

    let bindings = match configured {
        Some(path) => Pdfium::bind_to_library(&path).map_err(|e| {
            DocVerifyError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
        })?,
        None => Pdfium::bind_to_system_library()
            .map_err(|e| DocVerifyError::PdfiumBindingFailed(e.to_string()))?,
    };

    Ok(Pdfium::new(bindings))
}

fn write_scratch_file(bytes: &[u8], dir: Option<&Path>) -> Result<NamedTempFile, DocVerifyError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("docverify-").suffix(".pdf");

    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| DocVerifyError::Internal(format!("tempfile: {e}")))?;

    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| DocVerifyError::Internal(format!("tempfile write: {e}")))?;

    debug!("Scratch PDF at {}", file.path().display());
    Ok(file)
}
