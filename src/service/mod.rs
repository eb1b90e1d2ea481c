//! Lifecycle and status for the three prediction services.

mod health;

pub use health::HealthDescriptor;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::build::{BuildOptimizer, BuildTrainingRecord};
use crate::config::{PipelineMlConfig, BUILD_OPTIMIZER, FAILURE_PREDICTOR, TEST_INTELLIGENCE};
use crate::errors::{Error, Result};
use crate::failure::{FailurePredictor, FailureTrainingRecord};
use crate::test_selection::{TestSelector, TestTrainingRecord};

/// Aggregate health of all services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub healthy: bool,
    pub app_name: String,
    pub environment: String,
    pub models_loaded: usize,
    pub services: Vec<HealthDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub name: String,
    pub status: String,
    pub version: String,
    pub trained: bool,
    pub metrics: BTreeMap<String, f64>,
}

impl From<HealthDescriptor> for ModelStatus {
    fn from(health: HealthDescriptor) -> Self {
        Self {
            status: if health.model_trained { "trained" } else { "heuristic" }.to_string(),
            name: health.service,
            version: health.model_version,
            trained: health.model_trained,
            metrics: health.metrics,
        }
    }
}

/// Owns one instance of each prediction service
#[derive(Debug)]
pub struct ServiceManager {
    config: PipelineMlConfig,
    failure: FailurePredictor,
    build: BuildOptimizer,
    tests: TestSelector,
}

impl ServiceManager {
    pub fn new(config: PipelineMlConfig) -> Result<Self> {
        tracing::info!(app = %config.service.app_name, "Initializing prediction services");
        let failure = FailurePredictor::new(&config)?;
        let build = BuildOptimizer::new(&config)?;
        let tests = TestSelector::new(&config)?;
        Ok(Self {
            config,
            failure,
            build,
            tests,
        })
    }

    pub fn config(&self) -> &PipelineMlConfig {
        &self.config
    }

    pub fn failure_predictor(&self) -> &FailurePredictor {
        &self.failure
    }

    pub fn build_optimizer(&self) -> &BuildOptimizer {
        &self.build
    }

    pub fn test_selector(&self) -> &TestSelector {
        &self.tests
    }

    pub fn health(&self) -> ServiceHealth {
        let services = vec![self.build.health(), self.failure.health(), self.tests.health()];
        ServiceHealth {
            healthy: services.iter().all(|s| s.status == "healthy"),
            app_name: self.config.service.app_name.clone(),
            environment: self.config.service.environment.clone(),
            models_loaded: services.iter().filter(|s| s.model_trained).count(),
            services,
        }
    }

    pub fn models_status(&self) -> Vec<ModelStatus> {
        self.health().services.into_iter().map(ModelStatus::from).collect()
    }

    /// Retrain one model by name from raw JSON records.
    ///
    /// The record shape depends on the model; see each service's training
    /// record type.
    pub fn retrain(&self, model_name: &str, records: Value) -> Result<BTreeMap<String, f64>> {
        tracing::info!(model = model_name, "Triggering model retraining");
        match model_name {
            FAILURE_PREDICTOR => {
                let records: Vec<FailureTrainingRecord> = serde_json::from_value(records)?;
                self.failure.train(&records)
            }
            BUILD_OPTIMIZER => {
                let records: Vec<BuildTrainingRecord> = serde_json::from_value(records)?;
                self.build.train(&records)
            }
            TEST_INTELLIGENCE => {
                let records: Vec<TestTrainingRecord> = serde_json::from_value(records)?;
                self.tests.train(&records)
            }
            other => Err(Error::UnknownModel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> ServiceManager {
        ServiceManager::new(PipelineMlConfig::default()).unwrap()
    }

    #[test]
    fn test_health_lists_all_services() {
        let health = manager().health();
        assert!(health.healthy);
        assert_eq!(health.models_loaded, 0);
        let names: Vec<&str> = health.services.iter().map(|s| s.service.as_str()).collect();
        assert_eq!(names, vec![BUILD_OPTIMIZER, FAILURE_PREDICTOR, TEST_INTELLIGENCE]);
    }

    #[test]
    fn test_models_status_untrained() {
        let status = manager().models_status();
        assert_eq!(status.len(), 3);
        assert!(status.iter().all(|s| s.status == "heuristic" && s.version == "v0.0.0"));
    }

    #[test]
    fn test_retrain_unknown_model() {
        let err = manager().retrain("forecaster", json!([])).unwrap_err();
        assert!(matches!(err, Error::UnknownModel(name) if name == "forecaster"));
    }

    #[test]
    fn test_retrain_below_minimum() {
        let err = manager()
            .retrain(FAILURE_PREDICTOR, json!([{"metrics": {}, "failed": true}]))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData { samples: 1, minimum: 1000 }));
    }
}
