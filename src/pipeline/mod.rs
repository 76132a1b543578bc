//! Pipeline stages for document verification.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the provider-facing stages can be swapped without
//! touching normalisation.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ encode ──▶ extract ──▶ coerce ──▶ geocode
//! (bytes)   (JPEG)        (base64)   (VLM)       (JSON)     (verdict)
//!              │
//!              └─ render (pdfium, first PDF page only)
//! ```
//!
//! 1. [`input`]     — the uploaded bytes plus a filename hint
//! 2. [`normalize`] — raster decode or PDF render, then JPEG; runs in
//!    `spawn_blocking` because pdfium and the codecs are CPU-bound
//! 3. [`render`]    — pdfium binding and first-page rasterisation
//! 4. [`encode`]    — base64 data URI for the multimodal request body
//! 5. [`extract`]   — one vision request; never fails the run
//! 6. [`coerce`]    — turn the model's free text into the fixed record
//! 7. [`geocode`]   — forward-geocode the address and score it

pub mod coerce;
pub mod encode;
pub mod extract;
pub mod geocode;
pub mod input;
pub mod normalize;
pub mod render;
