//! Document normalisation: raster image or PDF → one JPEG buffer.
//!
//! Whatever was uploaded, downstream stages only ever see a
//! [`NormalizedImage`]: JPEG-encoded, RGB or 8-bit grayscale. JPEG has no
//! alpha channel and no palette, so every other colour mode is flattened to
//! RGB before encoding.

use crate::config::{AnalyzerConfig, NormalizeOptions};
use crate::error::DocVerifyError;
use crate::output::{ColorMode, DocumentKind, NormalizedImage};
use crate::pipeline::input::RawDocument;
use crate::pipeline::render;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageEncoder};
use tracing::{debug, info};

/// Normalise an uploaded document into a JPEG.
///
/// The CPU-bound decode/render/encode work runs on the blocking pool.
///
/// # Errors
/// - [`DocVerifyError::Decode`] — bytes are not a readable image
/// - [`DocVerifyError::EmptyDocument`] — PDF without pages
/// - [`DocVerifyError::CorruptPdf`] / [`DocVerifyError::PdfiumBindingFailed`]
pub async fn normalize(
    input: RawDocument,
    config: &AnalyzerConfig,
) -> Result<NormalizedImage, DocVerifyError> {
    let opts = config.normalize_options();
    tokio::task::spawn_blocking(move || normalize_blocking(&input, &opts))
        .await
        .map_err(|e| DocVerifyError::Internal(format!("Normalize task panicked: {}", e)))?
}

/// Blocking implementation of [`normalize`].
pub fn normalize_blocking(
    input: &RawDocument,
    opts: &NormalizeOptions,
) -> Result<NormalizedImage, DocVerifyError> {
    let (image, kind) = if input.is_pdf(opts.pdf_detection) {
        info!("Normalising PDF '{}' (first page)", input.file_name());
        let (image, page_count) = render::render_first_page(input, opts)?;
        (image, DocumentKind::Pdf { page_count })
    } else {
        info!("Normalising image '{}'", input.file_name());
        let image =
            image::load_from_memory(input.bytes()).map_err(|e| DocVerifyError::Decode {
                file_name: input.file_name().to_string(),
                detail: e.to_string(),
            })?;
        (image, DocumentKind::Raster)
    };

    encode_jpeg(image, opts.jpeg_quality, kind)
}

/// Map any colour mode onto one JPEG can carry.
///
/// RGB8 and L8 pass through; 16-bit grayscale stays grayscale at 8 bits;
/// everything else (alpha, 16-bit/float RGB) becomes RGB8.
fn to_jpeg_color(image: DynamicImage) -> (DynamicImage, ColorMode) {
    match image {
        DynamicImage::ImageRgb8(_) => (image, ColorMode::Rgb),
        DynamicImage::ImageLuma8(_) => (image, ColorMode::Grayscale),
        DynamicImage::ImageLuma16(_) => (DynamicImage::ImageLuma8(image.to_luma8()), ColorMode::Grayscale),
        other => (DynamicImage::ImageRgb8(other.to_rgb8()), ColorMode::Rgb),
    }
}

fn encode_jpeg(
    image: DynamicImage,
    quality: u8,
    kind: DocumentKind,
) -> Result<NormalizedImage, DocVerifyError> {
    let original = image.color();
    let (image, color) = to_jpeg_color(image);
    let (width, height) = (image.width(), image.height());

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(image.as_bytes(), width, height, image.color().into())
        .map_err(|e| DocVerifyError::Encode(e.to_string()))?;

    debug!(
        "Encoded {:?} {}x{} ({:?} source) → {} bytes JPEG q{}",
        color,
        width,
        height,
        original,
        buf.len(),
        quality
    );

    Ok(NormalizedImage::new(buf, width, height, color, kind))
}
