//! Static per-model configuration.
//!
//! Each service looks its model up by name at construction time. The
//! `feature_columns` list fixes the order of the vector handed to the
//! estimator, independent of how the feature map was populated.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{Error, Result};

pub const BUILD_OPTIMIZER: &str = "build_optimizer";
pub const FAILURE_PREDICTOR: &str = "failure_predictor";
pub const TEST_INTELLIGENCE: &str = "test_intelligence";

/// Which estimator implementation backs a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Squared-loss regressor, used for build durations
    LinearRegression,
    /// Log-loss classifier producing a probability
    LogisticRegression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub epochs: usize,
    /// Mini-batch size; 0 means full batch
    pub batch_size: usize,
    pub learning_rate: f64,
    /// L2 penalty applied to weights (not the bias)
    pub weight_decay: f64,
    /// Epochs without validation-loss improvement before stopping
    pub early_stopping_patience: usize,
    /// Fraction of samples held out for validation
    pub validation_split: f64,
    /// Reweight classes inversely to their frequency
    pub balanced_classes: bool,
}

/// Optional overrides read from `[models.<name>]` in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingOverrides {
    #[serde(default)]
    pub epochs: Option<usize>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub learning_rate: Option<f64>,
    #[serde(default)]
    pub weight_decay: Option<f64>,
    #[serde(default)]
    pub early_stopping_patience: Option<usize>,
    #[serde(default)]
    pub validation_split: Option<f64>,
}

impl TrainingParams {
    pub fn with_overrides(mut self, overrides: &TrainingOverrides) -> Self {
        if let Some(epochs) = overrides.epochs {
            self.epochs = epochs;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(lr) = overrides.learning_rate {
            self.learning_rate = lr;
        }
        if let Some(wd) = overrides.weight_decay {
            self.weight_decay = wd;
        }
        if let Some(patience) = overrides.early_stopping_patience {
            self.early_stopping_patience = patience;
        }
        if let Some(split) = overrides.validation_split {
            self.validation_split = split;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub estimator: EstimatorKind,
    pub feature_columns: Vec<String>,
    pub training: TrainingParams,
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

static REGISTRY: Lazy<BTreeMap<&'static str, ModelConfig>> = Lazy::new(|| {
    let mut models = BTreeMap::new();

    models.insert(
        BUILD_OPTIMIZER,
        ModelConfig {
            name: BUILD_OPTIMIZER.to_string(),
            estimator: EstimatorKind::LinearRegression,
            feature_columns: columns(&[
                "dependency_count",
                "code_change_size",
                "file_count",
                "test_count",
                "historical_build_time",
                "branch_complexity",
                "commit_frequency",
                "package_size",
            ]),
            training: TrainingParams {
                epochs: 100,
                batch_size: 0,
                learning_rate: 0.1,
                weight_decay: 0.0,
                early_stopping_patience: 10,
                validation_split: 0.2,
                balanced_classes: false,
            },
        },
    );

    models.insert(
        FAILURE_PREDICTOR,
        ModelConfig {
            name: FAILURE_PREDICTOR.to_string(),
            estimator: EstimatorKind::LogisticRegression,
            feature_columns: columns(&[
                "pipeline_duration_mean",
                "pipeline_duration_std",
                "failure_rate_7d",
                "code_churn",
                "test_coverage",
                "deployment_frequency",
                "error_rate",
                "response_time_p95",
                "resource_utilization",
            ]),
            training: TrainingParams {
                epochs: 100,
                batch_size: 32,
                learning_rate: 0.01,
                weight_decay: 1e-4,
                early_stopping_patience: 10,
                validation_split: 0.2,
                balanced_classes: false,
            },
        },
    );

    models.insert(
        TEST_INTELLIGENCE,
        ModelConfig {
            name: TEST_INTELLIGENCE.to_string(),
            estimator: EstimatorKind::LogisticRegression,
            feature_columns: columns(&[
                "file_change_overlap",
                "test_execution_time",
                "test_failure_history",
                "code_coverage_impact",
                "dependency_impact",
                "test_age",
                "flakiness_score",
            ]),
            training: TrainingParams {
                epochs: 200,
                batch_size: 0,
                learning_rate: 0.05,
                weight_decay: 0.0,
                early_stopping_patience: 10,
                validation_split: 0.2,
                balanced_classes: true,
            },
        },
    );

    models
});

/// Get model configuration by name
pub fn model_config(name: &str) -> Result<ModelConfig> {
    REGISTRY
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownModel(name.to_string()))
}
