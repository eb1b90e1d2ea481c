//! Change-aware test selection.
//!
//! Every candidate test gets a relevance score for the current change set,
//! from the trained classifier when one is loaded and from a weighted rule
//! otherwise. Tests at or above the threshold run; the rest are skipped and
//! their execution time counted as savings.

pub mod candidate;

pub use candidate::{extract_features, TestCandidate, TestSelectionRequest};

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ModelConfig, PipelineMlConfig, TEST_INTELLIGENCE};
use crate::errors::{Error, Result};
use crate::features::{feature_vector, value_or, FeatureMap};
use crate::model::evaluation::{accuracy, precision, recall, threshold};
use crate::model::split::stratified_split;
use crate::model::{
    fit_scaled, try_model, Dataset, FallbackReason, ModelSnapshot,
    PredictionSource, Scored, SnapshotCell,
};
use crate::service::HealthDescriptor;

/// Relevance cutoff for the rule-based score
pub const HEURISTIC_THRESHOLD: f64 = 0.3;
/// Probability cutoff for the trained classifier
pub const MODEL_THRESHOLD: f64 = 0.5;
/// Tests younger than this many days get a relevance bonus
const NEW_TEST_DAYS: f64 = 7.0;
/// Tests above this flakiness score are reported
pub const FLAKY_THRESHOLD: f64 = 0.2;

const HEURISTIC_CONFIDENCE: f64 = 0.6;
const MODEL_CONFIDENCE: f64 = 0.8;

/// Weighted relevance of one test to the change set, in 0..=1
pub fn heuristic_relevance(features: &FeatureMap) -> f64 {
    let mut score = 0.5 * value_or(features, "file_change_overlap", 0.0)
        + 0.2 * value_or(features, "dependency_impact", 0.0)
        + 0.15 * value_or(features, "test_failure_history", 0.0).min(1.0)
        + 0.15 * value_or(features, "code_coverage_impact", 0.0).min(1.0);
    if value_or(features, "test_age", f64::MAX) < NEW_TEST_DAYS {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTest {
    pub name: String,
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlakyTest {
    pub test_name: String,
    pub flakiness_score: f64,
    pub failure_rate: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSelectionResponse {
    pub project_name: String,
    pub total_tests: usize,
    /// Highest relevance first
    pub selected_tests: Vec<SelectedTest>,
    pub skipped_tests: Vec<String>,
    /// Seconds saved by not running the skipped tests
    pub estimated_time_savings: f64,
    /// Share of the suite's coverage impact kept by the selection
    pub coverage_retention: f64,
    pub confidence: f64,
    pub flaky_tests: Vec<FlakyTest>,
    pub timestamp: String,
    pub model_version: String,
    pub source: PredictionSource,
}

/// Flaky tests, worst first
pub fn flaky_report(tests: &[TestCandidate]) -> Vec<FlakyTest> {
    let mut flaky: Vec<FlakyTest> = tests
        .iter()
        .filter(|t| t.flakiness_score > FLAKY_THRESHOLD)
        .map(|t| FlakyTest {
            test_name: t.name.clone(),
            flakiness_score: t.flakiness_score,
            failure_rate: t.failure_rate,
            recommendation: if t.flakiness_score > 0.3 {
                "Quarantine the test and add retry logic or a longer timeout".to_string()
            } else {
                "Mock external services for more reliable runs".to_string()
            },
        })
        .collect();
    flaky.sort_by(|a, b| b.flakiness_score.total_cmp(&a.flakiness_score));
    flaky
}

/// A labelled test outcome: `selected` is true when the test was relevant
/// to (failed on, or covered) the change it ran against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestTrainingRecord {
    pub features: FeatureMap,
    pub selected: bool,
}

#[derive(Debug)]
pub struct TestSelector {
    model: ModelConfig,
    min_training_samples: usize,
    storage_path: PathBuf,
    state: SnapshotCell,
}

impl TestSelector {
    pub fn new(config: &PipelineMlConfig) -> Result<Self> {
        let mut selector = Self::with_model_config(
            config.model_config(TEST_INTELLIGENCE)?,
            config.training.min_training_samples,
        );
        selector.storage_path = config.training.model_storage_path.join(TEST_INTELLIGENCE);
        selector.load_model();
        Ok(selector)
    }

    pub fn with_model_config(model: ModelConfig, min_training_samples: usize) -> Self {
        let state = SnapshotCell::new(ModelSnapshot::untrained(model.feature_columns.clone()));
        Self {
            model,
            min_training_samples,
            storage_path: PathBuf::from("./models").join(TEST_INTELLIGENCE),
            state,
        }
    }

    pub fn load_model(&self) {
        tracing::info!(
            path = %self.storage_path.display(),
            "Model persistence disabled, starting with heuristic test selection"
        );
    }

    pub fn is_trained(&self) -> bool {
        self.state.load().trained
    }

    pub fn install_snapshot(&self, snapshot: ModelSnapshot) {
        self.state.swap(snapshot);
    }

    pub fn select_tests(&self, request: &TestSelectionRequest) -> TestSelectionResponse {
        let snapshot = self.state.load();
        let changed = &request.changed_files;

        // Score every test; a single model failure drops the whole request to
        // the heuristic so relevances stay comparable
        let features: Vec<FeatureMap> = request
            .tests
            .par_iter()
            .map(|t| extract_features(t, changed))
            .collect();
        let model_scores: std::result::Result<Vec<f64>, FallbackReason> = if snapshot.trained {
            features
                .iter()
                .map(|f| match try_model(TEST_INTELLIGENCE, &snapshot, f) {
                    Scored::Model(p) => Ok(p.clamp(0.0, 1.0)),
                    Scored::Fallback(reason) => Err(reason),
                })
                .collect()
        } else {
            Err(FallbackReason::Untrained)
        };

        let (relevances, source, cutoff, confidence) = match model_scores {
            Ok(probabilities) => (
                probabilities,
                PredictionSource::Model,
                request.threshold.unwrap_or(MODEL_THRESHOLD),
                MODEL_CONFIDENCE,
            ),
            Err(reason) => (
                features.iter().map(heuristic_relevance).collect::<Vec<_>>(),
                PredictionSource::heuristic(reason),
                request.threshold.unwrap_or(HEURISTIC_THRESHOLD),
                HEURISTIC_CONFIDENCE,
            ),
        };

        let mut selected = Vec::new();
        let mut skipped = Vec::new();
        let mut time_saved = 0.0;
        let mut coverage_kept = 0.0;
        let coverage_total: f64 = request.tests.iter().map(|t| t.coverage_impact.max(0.0)).sum();

        for (test, &relevance) in request.tests.iter().zip(&relevances) {
            if relevance >= cutoff {
                coverage_kept += test.coverage_impact.max(0.0);
                selected.push(SelectedTest {
                    name: test.name.clone(),
                    relevance,
                });
            } else {
                time_saved += test.execution_time.max(0.0);
                skipped.push(test.name.clone());
            }
        }
        selected.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

        let coverage_retention = if coverage_total > 0.0 {
            coverage_kept / coverage_total
        } else {
            1.0
        };

        tracing::info!(
            project = %request.project_name,
            total = request.tests.len(),
            selected = selected.len(),
            time_saved,
            source = %source,
            "Test selection completed"
        );

        TestSelectionResponse {
            project_name: request.project_name.clone(),
            total_tests: request.tests.len(),
            selected_tests: selected,
            skipped_tests: skipped,
            estimated_time_savings: time_saved,
            coverage_retention,
            confidence,
            flaky_tests: flaky_report(&request.tests),
            timestamp: Utc::now().to_rfc3339(),
            model_version: snapshot.version(),
            source,
        }
    }

    /// Fit a new relevance classifier and swap it in.
    ///
    /// Returns accuracy, precision and recall on the held-out partition.
    pub fn train(&self, records: &[TestTrainingRecord]) -> Result<BTreeMap<String, f64>> {
        let _guard = self.state.training_guard();
        tracing::info!(samples = records.len(), "Starting test selection model training");

        if records.len() < self.min_training_samples {
            return Err(Error::InsufficientData {
                samples: records.len(),
                minimum: self.min_training_samples,
            });
        }
        let positives = records.iter().filter(|r| r.selected).count();
        if positives < 2 || records.len() - positives < 2 {
            return Err(Error::InvalidTrainingData(format!(
                "need at least two selected and two skipped tests, got {positives} of {}",
                records.len()
            )));
        }

        let columns = &self.model.feature_columns;
        let rows = records
            .iter()
            .map(|r| feature_vector(&r.features, columns))
            .collect();
        let targets = records
            .iter()
            .map(|r| if r.selected { 1.0 } else { 0.0 })
            .collect();
        let dataset = Dataset::new(rows, targets)?;

        let params = &self.model.training;
        let split = stratified_split(&dataset.targets, params.validation_split);
        let train = dataset.select(&split.train);
        let test = dataset.select(&split.test);

        let (estimator, scaler, test_rows, _) =
            fit_scaled(self.model.estimator, params, &train, &test)?;
        let predicted = threshold(&estimator.predict_many(&test_rows)?);

        let metrics = BTreeMap::from([
            ("accuracy".to_string(), accuracy(&test.targets, &predicted)),
            ("precision".to_string(), precision(&test.targets, &predicted)),
            ("recall".to_string(), recall(&test.targets, &predicted)),
        ]);

        self.state.swap(ModelSnapshot::trained(
            Arc::from(estimator),
            Some(scaler),
            columns.clone(),
            metrics.clone(),
            Utc::now(),
        ));
        tracing::info!(
            accuracy = metrics["accuracy"],
            precision = metrics["precision"],
            recall = metrics["recall"],
            "Model training completed"
        );
        Ok(metrics)
    }

    pub fn health(&self) -> HealthDescriptor {
        HealthDescriptor::from_snapshot(TEST_INTELLIGENCE, &self.state.load())
    }
}
