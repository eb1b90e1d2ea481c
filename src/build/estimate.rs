use crate::features::{value_or, FeatureMap};

pub const HEURISTIC_CONFIDENCE: f64 = 0.6;
pub const HEURISTIC_OPTIMIZATION_POTENTIAL: f64 = 0.2;
/// Model estimates are never reported below this many seconds
pub const MIN_BUILD_SECONDS: f64 = 30.0;

/// Rule-based build duration in seconds
pub fn heuristic_build_time(features: &FeatureMap) -> f64 {
    let base = 120.0;
    let dependency_time = value_or(features, "dependency_count", 0.0) * 5.0;
    let change_time = value_or(features, "code_change_size", 0.0) * 0.1;
    let test_time = value_or(features, "test_count", 0.0) * 2.0;
    let historical = value_or(features, "historical_build_time", 300.0) * 0.3;
    base + dependency_time + change_time + test_time + historical
}

/// Confidence for a model estimate, computed on the unfloored prediction
pub fn model_confidence(features: &FeatureMap, prediction: f64) -> f64 {
    let mut confidence = 0.8;
    if !(60.0..=1800.0).contains(&prediction) {
        confidence *= 0.8;
    }
    if value_or(features, "historical_build_time", 0.0) > 0.0 {
        confidence *= 1.1;
    }
    f64::min(1.0, confidence)
}

/// Fraction of build time caching and parallelism could plausibly save
pub fn optimization_potential(features: &FeatureMap, prediction: f64) -> f64 {
    if prediction < 120.0 {
        return 0.1;
    }
    let mut potential = 0.3;
    if value_or(features, "dependency_count", 0.0) > 20.0 {
        potential += 0.2;
    }
    if prediction > 600.0 {
        potential += 0.3;
    }
    f64::min(0.8, potential)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(pairs: &[(&str, f64)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_heuristic_formula() {
        let f = features(&[
            ("dependency_count", 10.0),
            ("code_change_size", 200.0),
            ("test_count", 30.0),
            ("historical_build_time", 400.0),
        ]);
        // 120 + 50 + 20 + 60 + 120
        assert!((heuristic_build_time(&f) - 370.0).abs() < 1e-9);
    }

    #[test]
    fn test_heuristic_empty_features_uses_default_history() {
        assert!((heuristic_build_time(&FeatureMap::new()) - 210.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence() {
        let with_history = features(&[("historical_build_time", 300.0)]);
        assert!((model_confidence(&with_history, 300.0) - 0.88).abs() < 1e-12);
        assert!((model_confidence(&with_history, 2000.0) - 0.704).abs() < 1e-12);
        assert!((model_confidence(&FeatureMap::new(), 30.0) - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_optimization_potential() {
        let many_deps = features(&[("dependency_count", 25.0)]);
        assert_eq!(optimization_potential(&many_deps, 100.0), 0.1);
        assert!((optimization_potential(&FeatureMap::new(), 300.0) - 0.3).abs() < 1e-12);
        assert!((optimization_potential(&many_deps, 300.0) - 0.5).abs() < 1e-12);
        assert!((optimization_potential(&many_deps, 900.0) - 0.8).abs() < 1e-12);
    }
}
