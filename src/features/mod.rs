//! Feature mappings shared by every prediction service.
//!
//! A [`FeatureMap`] is the flat numeric view of one request. Extractors fill
//! it from nested input records with documented defaults; the configured
//! column list then fixes the order of the vector a model sees.

pub mod stats;
pub mod time;

use std::collections::BTreeMap;

/// Named numeric features for a single entity
pub type FeatureMap = BTreeMap<String, f64>;

/// Build the model input vector in configured column order.
///
/// Missing keys become 0.0; extra keys in the map are ignored.
pub fn feature_vector(features: &FeatureMap, columns: &[String]) -> Vec<f64> {
    columns
        .iter()
        .map(|column| features.get(column).copied().unwrap_or(0.0))
        .collect()
}

/// Lookup with a fallback, for rules that read optional features
pub fn value_or(features: &FeatureMap, key: &str, default: f64) -> f64 {
    features.get(key).copied().unwrap_or(default)
}
