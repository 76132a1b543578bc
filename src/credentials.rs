//! Per-run provider credentials.
//!
//! Keys are handed to each stage call explicitly. Nothing in the crate keeps
//! them in a global or in [`crate::AnalyzerConfig`], so two runs with
//! different keys can share one config.

use std::fmt;

/// API keys for the two external providers.
#[derive(Clone, Default)]
pub struct Credentials {
    extraction_api_key: String,
    geocoding_api_key: String,
}

impl Credentials {
    pub fn new(extraction_api_key: impl Into<String>, geocoding_api_key: impl Into<String>) -> Self {
        Self {
            extraction_api_key: extraction_api_key.into(),
            geocoding_api_key: geocoding_api_key.into(),
        }
    }

    /// Key for the vision chat-completion endpoint.
    pub fn extraction_api_key(&self) -> &str {
        &self.extraction_api_key
    }

    /// Key for the geocoding endpoint.
    pub fn geocoding_api_key(&self) -> &str {
        &self.geocoding_api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &str| if k.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("Credentials")
            .field("extraction_api_key", &redact(&self.extraction_api_key))
            .field("geocoding_api_key", &redact(&self.geocoding_api_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_keys() {
        let c = Credentials::new("sk-secret", "");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
        assert!(dbg.contains("<unset>"));
    }
}
