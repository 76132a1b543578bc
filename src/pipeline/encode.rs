//! Image encoding: [`NormalizedImage`] → base64 payload for the vision request.
//!
//! VLM APIs accept images as base64 data URIs embedded in the JSON request
//! body. The normaliser already produced JPEG, so this stage only wraps it.
//! `detail: "high"` lets GPT-4-class models tile the page at full
//! resolution; fine print such as postcodes is lost at `low`.

use crate::output::NormalizedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// MIME type of every normalised image.
pub const JPEG_MIME: &str = "image/jpeg";

/// Detail level requested for the image part.
pub const IMAGE_DETAIL: &str = "high";

/// A normalised image ready to be embedded in a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Standard base64 of the JPEG bytes, no line breaks.
    pub base64: String,
    pub mime_type: &'static str,
    pub detail: &'static str,
}

impl EncodedImage {
    /// `data:image/jpeg;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Encode the JPEG as base64. Consumes the image: it is used exactly once.
pub fn encode_image(image: NormalizedImage) -> EncodedImage {
    let base64 = STANDARD.encode(image.into_bytes());
    debug!("Encoded image → {} bytes base64", base64.len());
    EncodedImage {
        base64,
        mime_type: JPEG_MIME,
        detail: IMAGE_DETAIL,
    }
}
