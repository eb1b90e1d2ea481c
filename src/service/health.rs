use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ModelSnapshot;

/// Health report for a single prediction service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDescriptor {
    pub service: String,
    pub status: String,
    pub model_trained: bool,
    /// RFC 3339 time of the last successful training run
    pub last_training: Option<String>,
    pub model_version: String,
    pub metrics: BTreeMap<String, f64>,
}

impl HealthDescriptor {
    /// A service is healthy whether or not it has a model; the heuristic
    /// path always answers
    pub fn from_snapshot(service: &str, snapshot: &ModelSnapshot) -> Self {
        Self {
            service: service.to_string(),
            status: "healthy".to_string(),
            model_trained: snapshot.trained,
            last_training: snapshot.last_training_time.map(|t| t.to_rfc3339()),
            model_version: snapshot.version(),
            metrics: snapshot.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrained_health() {
        let health = HealthDescriptor::from_snapshot("failure_predictor", &ModelSnapshot::untrained(vec![]));
        assert_eq!(health.status, "healthy");
        assert!(!health.model_trained);
        assert_eq!(health.last_training, None);
        assert_eq!(health.model_version, "v0.0.0");
    }
}
