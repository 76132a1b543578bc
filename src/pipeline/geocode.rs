//! Address validation via forward geocoding.
//!
//! The address is sent to a Geoapify-style search endpoint
//! (`GET {geocode_url}?text=…&apiKey=…`). The reply is a GeoJSON
//! `FeatureCollection`; only the first feature is inspected. Its
//! `properties.rank.confidence` is the sole validity signal:
//!
//! ```text
//! { "features": [ { "properties": {
//!       "formatted": "1 Main St, Springfield, IL 62701, United States",
//!       "rank": { "confidence": 0.92, "match_type": "full_match", … },
//!       …
//! } } ] }
//! ```
//!
//! Like extraction, validation never returns `Err`: failures are recorded in
//! [`ValidationResult::error`] with an invalid, zero-confidence verdict.

use crate::config::AnalyzerConfig;
use crate::credentials::Credentials;
use crate::error::StageError;
use crate::output::ValidationResult;
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Provider label used in transport errors.
const GEOCODER: &str = "geocoder";

/// Validate `address` against the configured geocoder.
pub async fn validate(
    address: &str,
    credentials: &Credentials,
    config: &AnalyzerConfig,
) -> ValidationResult {
    let start = Instant::now();
    info!("Validating address via {}", config.geocode_url);

    let result = match lookup(address, credentials, config).await {
        Ok(body) => interpret_geocode(body, config.confidence_threshold),
        Err(err) => {
            warn!("Address validation failed: {}", err);
            ValidationResult::failed(err)
        }
    };

    debug!(
        "Validation finished in {:?}: valid={}, confidence={:.2}",
        start.elapsed(),
        result.is_valid(),
        result.confidence()
    );
    result
}

async fn lookup(
    address: &str,
    credentials: &Credentials,
    config: &AnalyzerConfig,
) -> Result<Value, StageError> {
    let transport = |detail: String| StageError::ProviderTransport {
        provider: GEOCODER.to_string(),
        detail,
    };

    let client = config
        .http_client()
        .map_err(|e| transport(format!("HTTP client: {e}")))?;

    let response = client
        .get(&config.geocode_url)
        .query(&[("text", address), ("apiKey", credentials.geocoding_api_key())])
        .send()
        .await
        .map_err(|e| transport(e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StageError::GeocodeLookup {
            status: status.as_u16(),
            detail: body.trim().to_string(),
        });
    }

    response.json::<Value>().await.map_err(|e| StageError::GeocodeLookup {
        status: status.as_u16(),
        detail: format!("unreadable response body: {}", e.without_url()),
    })
}

/// Turn a geocoder response into a verdict.
///
/// An empty or missing `features` array is a legitimate "no match": the
/// verdict is invalid with zero confidence but carries no error.
pub fn interpret_geocode(body: Value, threshold: f64) -> ValidationResult {
    let empty = Map::new();
    let properties = body
        .get("features")
        .and_then(Value::as_array)
        .and_then(|features| features.first())
        .and_then(|feature| feature.get("properties"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let rank = properties.get("rank").and_then(Value::as_object);
    let confidence = rank
        .and_then(|r| r.get("confidence"))
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite());

    let (is_valid, confidence) = match confidence {
        Some(c) => {
            let c = c.clamp(0.0, 1.0);
            (c >= threshold, c)
        }
        None => (false, 0.0),
    };

    let formatted = properties
        .get("formatted")
        .and_then(Value::as_str)
        .map(str::to_string);
    let rank = rank.cloned();

    ValidationResult::new(is_valid, confidence, formatted, rank, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(confidence: f64) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "formatted": "1 Main Street, Springfield, IL 62701, United States of America",
                    "country": "United States",
                    "rank": {"confidence": confidence, "match_type": "full_match"}
                }
            }]
        })
    }

    #[test]
    fn high_confidence_is_valid() {
        let r = interpret_geocode(response(0.92), 0.8);
        assert!(r.is_valid());
        assert_eq!(r.confidence(), 0.92);
        assert!(r.error().is_none());
        assert_eq!(
            r.formatted_address(),
            Some("1 Main Street, Springfield, IL 62701, United States of America")
        );
        let rank = r.confidence_details().expect("rank carried");
        assert_eq!(rank["match_type"], "full_match");
        assert!(r.details().is_some());
    }

    #[test]
    fn low_confidence_is_invalid() {
        let r = interpret_geocode(response(0.5), 0.8);
        assert!(!r.is_valid());
        assert_eq!(r.confidence(), 0.5);
        assert!(r.error().is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(interpret_geocode(response(0.8), 0.8).is_valid());
    }

    #[test]
    fn empty_features_is_no_match_without_error() {
        let r = interpret_geocode(json!({"type": "FeatureCollection", "features": []}), 0.8);
        assert!(!r.is_valid());
        assert_eq!(r.confidence(), 0.0);
        assert!(r.error().is_none());
        assert!(r.formatted_address().is_none());
        assert_eq!(r.details(), Some(&json!({"type": "FeatureCollection", "features": []})));
    }

    #[test]
    fn rank_without_confidence_scores_zero() {
        let body = json!({"features": [{"properties": {"rank": {"match_type": "inner_part"}}}]});
        let r = interpret_geocode(body, 0.8);
        assert!(!r.is_valid());
        assert_eq!(r.confidence(), 0.0);
        assert!(r.confidence_details().is_some());
    }

    #[test]
    fn formatted_address_is_kept_for_invalid_matches() {
        let r = interpret_geocode(response(0.3), 0.8);
        assert!(!r.is_valid());
        assert!(r.formatted_address().is_some());
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let r = interpret_geocode(response(1.7), 0.8);
        assert_eq!(r.confidence(), 1.0);
        assert!(r.is_valid());
    }
}
