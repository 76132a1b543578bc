//! Result records produced by each pipeline stage.
//!
//! Every record is built once by its stage and exposed read-only: fields are
//! private and reached through accessors, so a result cannot drift after the
//! stage that produced it has returned.

use crate::error::StageError;
use serde::Serialize;
use serde_json::{Map, Value};

// ── Normalised image ─────────────────────────────────────────────────────

/// Colour mode of a [`NormalizedImage`]. JPEG output is only ever one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Rgb,
    Grayscale,
}

/// Where the normalised image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentKind {
    /// A JPEG or PNG upload.
    Raster,
    /// The first page of a PDF with `page_count` pages.
    Pdf { page_count: usize },
}

/// The single JPEG buffer every downstream stage consumes.
///
/// Moved into [`crate::pipeline::extract::extract`], which consumes it.
#[derive(Clone)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    color: ColorMode,
    kind: DocumentKind,
}

impl NormalizedImage {
    pub(crate) fn new(
        bytes: Vec<u8>,
        width: u32,
        height: u32,
        color: ColorMode,
        kind: DocumentKind,
    ) -> Self {
        Self {
            bytes,
            width,
            height,
            color,
            kind,
        }
    }

    /// The JPEG-encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("bytes", &format_args!("<{} bytes of JPEG>", self.bytes.len()))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("color", &self.color)
            .field("kind", &self.kind)
            .finish()
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Structured fields read off the document by the vision model.
///
/// All four primary fields are always present. Anything the model did not
/// return (or any failure) leaves them at `""` / `false`, with the cause in
/// [`ExtractionResult::error`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    is_bank_statement: bool,
    name: String,
    address: String,
    document_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<StageError>,
}

impl ExtractionResult {
    pub(crate) fn from_fields(
        is_bank_statement: bool,
        name: String,
        address: String,
        document_date: String,
    ) -> Self {
        Self {
            is_bank_statement,
            name,
            address,
            document_date,
            error: None,
        }
    }

    /// Empty record carrying the failure.
    pub(crate) fn failed(error: StageError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_bank_statement(&self) -> bool {
        self.is_bank_statement
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn document_date(&self) -> &str {
        &self.document_date
    }

    pub fn error(&self) -> Option<&StageError> {
        self.error.as_ref()
    }
}

// ── Validation ───────────────────────────────────────────────────────────

/// Verdict on an extracted address.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence_details: Option<Map<String, Value>>,
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<StageError>,
}

impl ValidationResult {
    pub(crate) fn new(
        is_valid: bool,
        confidence: f64,
        formatted_address: Option<String>,
        confidence_details: Option<Map<String, Value>>,
        details: Value,
    ) -> Self {
        Self {
            is_valid,
            confidence,
            formatted_address,
            confidence_details,
            details: Some(details),
            error: None,
        }
    }

    /// Invalid, zero-confidence record without provider details.
    pub(crate) fn failed(error: StageError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Geocoder confidence in `[0, 1]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn formatted_address(&self) -> Option<&str> {
        self.formatted_address.as_deref()
    }

    /// The raw `rank` object of the best match.
    pub fn confidence_details(&self) -> Option<&Map<String, Value>> {
        self.confidence_details.as_ref()
    }

    /// The full geocoder response.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn error(&self) -> Option<&StageError> {
        self.error.as_ref()
    }

    /// Location fields of the first feature, if the geocoder returned one.
    pub fn best_match(&self) -> Option<GeocodeMatch> {
        let props = self
            .details
            .as_ref()?
            .get("features")?
            .as_array()?
            .first()?
            .get("properties")?
            .as_object()?;
        Some(GeocodeMatch::from_properties(props))
    }
}

/// Typed view over a geocoder feature's `properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeocodeMatch {
    pub formatted: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub street: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl GeocodeMatch {
    fn from_properties(props: &Map<String, Value>) -> Self {
        // Postcodes come back as numbers for some countries.
        let text = |key: &str| -> Option<String> {
            match props.get(key)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };
        Self {
            formatted: text("formatted"),
            country: text("country"),
            city: text("city"),
            state: text("state"),
            postcode: text("postcode"),
            street: text("street"),
            lat: props.get("lat").and_then(Value::as_f64),
            lon: props.get("lon").and_then(Value::as_f64),
        }
    }

    /// `(lat, lon)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

// ── Whole run ────────────────────────────────────────────────────────────

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub file_name: String,
    pub document: DocumentKind,
    pub extraction: ExtractionResult,
    /// `None` when no address was extracted, so nothing was validated.
    pub validation: Option<ValidationResult>,
    pub stats: AnalysisStats,
}

/// Timing and size figures for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    pub image_width: u32,
    pub image_height: u32,
    pub jpeg_bytes: usize,
    pub normalize_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub validate_duration_ms: u64,
    pub total_duration_ms: u64,
}
