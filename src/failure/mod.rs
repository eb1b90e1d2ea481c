//! Pipeline failure prediction.
//!
//! [`FailurePredictor::predict_failure`] runs the full pipeline for one
//! request: feature extraction, model-or-heuristic scoring, risk analysis
//! and report assembly. It never fails; when the model is missing or
//! errors, the rule-based score answers and the report says so in
//! `source`.

pub mod analysis;
pub mod extract;
pub mod heuristic;
pub mod metrics;

pub use analysis::{
    analyze_risk_factors, generate_recommendations, Priority, Recommendation,
    RecommendationType, RiskFactor, Severity,
};
pub use extract::extract_features;
pub use heuristic::{heuristic_probability, RiskLevel};
pub use metrics::PipelineMetrics;

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ModelConfig, PipelineMlConfig, FAILURE_PREDICTOR};
use crate::errors::{Error, Result};
use crate::features::{feature_vector, FeatureMap};
use crate::model::evaluation::{f1_score, precision, recall, roc_auc, threshold};
use crate::model::split::stratified_split;
use crate::model::{
    fit_scaled, try_model, Dataset, ModelSnapshot, PredictionSource, Scored,
    SnapshotCell,
};
use crate::service::HealthDescriptor;

/// Scored failure probability before risk analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePrediction {
    pub probability: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub source: PredictionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePredictionReport {
    pub failure_probability: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<Recommendation>,
    pub timestamp: String,
    pub model_version: String,
    pub source: PredictionSource,
}

/// One labelled pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureTrainingRecord {
    pub metrics: PipelineMetrics,
    pub failed: bool,
}

#[derive(Debug)]
pub struct FailurePredictor {
    model: ModelConfig,
    min_training_samples: usize,
    storage_path: PathBuf,
    state: SnapshotCell,
}

impl FailurePredictor {
    pub fn new(config: &PipelineMlConfig) -> Result<Self> {
        let predictor = Self::with_model_config(
            config.model_config(FAILURE_PREDICTOR)?,
            config.training.min_training_samples,
        )
        .with_storage_path(config.training.model_storage_path.join(FAILURE_PREDICTOR));
        predictor.load_model();
        Ok(predictor)
    }

    pub fn with_model_config(model: ModelConfig, min_training_samples: usize) -> Self {
        let state = SnapshotCell::new(ModelSnapshot::untrained(model.feature_columns.clone()));
        Self {
            model,
            min_training_samples,
            storage_path: PathBuf::from("./models").join(FAILURE_PREDICTOR),
            state,
        }
    }

    pub fn with_storage_path(mut self, path: PathBuf) -> Self {
        self.storage_path = path;
        self
    }

    /// Artifacts are not persisted; the predictor always starts untrained
    pub fn load_model(&self) {
        tracing::info!(
            path = %self.storage_path.display(),
            "Model persistence disabled, starting with heuristic predictions"
        );
    }

    pub fn is_trained(&self) -> bool {
        self.state.load().trained
    }

    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.state.load()
    }

    /// Replace the current model, e.g. with one fitted elsewhere
    pub fn install_snapshot(&self, snapshot: ModelSnapshot) {
        self.state.swap(snapshot);
    }

    /// Score extracted features against the current snapshot
    pub fn predict(&self, features: &FeatureMap) -> FailurePrediction {
        Self::predict_with(&self.state.load(), features)
    }

    fn predict_with(snapshot: &ModelSnapshot, features: &FeatureMap) -> FailurePrediction {
        match try_model(FAILURE_PREDICTOR, snapshot, features) {
            Scored::Model(raw) => {
                let probability = raw.clamp(0.0, 1.0);
                FailurePrediction {
                    probability,
                    confidence: heuristic::model_confidence(features, probability),
                    risk_level: RiskLevel::from_probability(probability),
                    source: PredictionSource::Model,
                }
            }
            Scored::Fallback(reason) => {
                let probability = heuristic_probability(features);
                FailurePrediction {
                    probability,
                    confidence: heuristic::HEURISTIC_CONFIDENCE,
                    risk_level: RiskLevel::from_probability(probability),
                    source: PredictionSource::heuristic(reason),
                }
            }
        }
    }

    pub fn predict_failure(&self, metrics: &PipelineMetrics) -> FailurePredictionReport {
        tracing::debug!("Predicting pipeline failure");
        let snapshot = self.state.load();
        let features = extract_features(metrics);
        let prediction = Self::predict_with(&snapshot, &features);
        let risk_factors = analyze_risk_factors(&features);
        let recommendations = generate_recommendations(
            &features,
            prediction.probability,
            prediction.risk_level,
            &risk_factors,
        );

        tracing::info!(
            probability = prediction.probability,
            risk_level = %prediction.risk_level,
            source = %prediction.source,
            "Failure prediction completed"
        );

        FailurePredictionReport {
            failure_probability: prediction.probability,
            confidence: prediction.confidence,
            risk_level: prediction.risk_level,
            risk_factors,
            recommendations,
            timestamp: Utc::now().to_rfc3339(),
            model_version: snapshot.version(),
            source: prediction.source,
        }
    }

    pub fn predict_batch(&self, batch: &[PipelineMetrics]) -> Vec<FailurePredictionReport> {
        batch.par_iter().map(|m| self.predict_failure(m)).collect()
    }

    /// Fit a new classifier and swap it in.
    ///
    /// Returns precision, recall, f1_score and auc_score on the held-out
    /// partition. On error the previous snapshot stays in place.
    pub fn train(&self, records: &[FailureTrainingRecord]) -> Result<BTreeMap<String, f64>> {
        let _guard = self.state.training_guard();
        tracing::info!(samples = records.len(), "Starting failure prediction model training");

        if records.len() < self.min_training_samples {
            return Err(Error::InsufficientData {
                samples: records.len(),
                minimum: self.min_training_samples,
            });
        }

        let columns = &self.model.feature_columns;
        let rows: Vec<Vec<f64>> = records
            .par_iter()
            .map(|r| feature_vector(&extract_features(&r.metrics), columns))
            .collect();
        let targets: Vec<f64> = records
            .iter()
            .map(|r| if r.failed { 1.0 } else { 0.0 })
            .collect();

        let failures = records.iter().filter(|r| r.failed).count();
        if failures < 2 || records.len() - failures < 2 {
            return Err(Error::InvalidTrainingData(format!(
                "need at least two failed and two successful runs, got {failures} of {}",
                records.len()
            )));
        }

        let dataset = Dataset::new(rows, targets)?;
        let params = &self.model.training;
        let split = stratified_split(&dataset.targets, params.validation_split);
        let train = dataset.select(&split.train);
        let test = dataset.select(&split.test);

        let (estimator, scaler, test_rows, _) =
            fit_scaled(self.model.estimator, params, &train, &test)?;
        let probabilities = estimator.predict_many(&test_rows)?;
        let predicted = threshold(&probabilities);
        let auc = roc_auc(&test.targets, &probabilities)
            .ok_or_else(|| Error::Fit("AUC undefined for single-class hold-out".to_string()))?;

        let metrics = BTreeMap::from([
            ("precision".to_string(), precision(&test.targets, &predicted)),
            ("recall".to_string(), recall(&test.targets, &predicted)),
            ("f1_score".to_string(), f1_score(&test.targets, &predicted)),
            ("auc_score".to_string(), auc),
        ]);

        self.state.swap(ModelSnapshot::trained(
            Arc::from(estimator),
            Some(scaler),
            columns.clone(),
            metrics.clone(),
            Utc::now(),
        ));

        tracing::info!(
            precision = metrics["precision"],
            recall = metrics["recall"],
            f1_score = metrics["f1_score"],
            auc_score = auc,
            "Model training completed"
        );
        Ok(metrics)
    }

    pub fn health(&self) -> HealthDescriptor {
        HealthDescriptor::from_snapshot(FAILURE_PREDICTOR, &self.state.load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model_config;

    fn predictor(min_samples: usize) -> FailurePredictor {
        FailurePredictor::with_model_config(model_config(FAILURE_PREDICTOR).unwrap(), min_samples)
    }

    #[test]
    fn test_untrained_uses_heuristic() {
        let report = predictor(10).predict_failure(&PipelineMetrics::default());
        assert!((report.failure_probability - 0.015).abs() < 1e-12);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.confidence, 0.6);
        assert_eq!(report.model_version, "v0.0.0");
        assert!(!report.source.is_model());
        assert!(report.risk_factors.is_empty());
    }

    #[test]
    fn test_insufficient_data_leaves_state() {
        let p = predictor(1000);
        let records = vec![
            FailureTrainingRecord {
                metrics: PipelineMetrics::default(),
                failed: true,
            };
            10
        ];
        let err = p.train(&records).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { samples: 10, minimum: 1000 }));
        assert!(!p.is_trained());
    }

    #[test]
    fn test_single_class_is_rejected() {
        let p = predictor(5);
        let records = vec![
            FailureTrainingRecord {
                metrics: PipelineMetrics::default(),
                failed: false,
            };
            20
        ];
        assert!(matches!(p.train(&records), Err(Error::InvalidTrainingData(_))));
        assert!(!p.is_trained());
    }
}
