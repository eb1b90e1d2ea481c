//! Build-time estimation and optimization recommendations.

pub mod estimate;
pub mod extract;
pub mod recommend;
pub mod request;

pub use extract::extract_features;
pub use recommend::{
    BuildRecommendations, BuildStepOptimization, CacheLayer, CacheStrategy,
    DependencyIssue, DependencyOptimization, Parallelization, ResourceAllocation,
};
pub use request::{BuildConfig, BuildOptimizationRequest, BuildRecord, CodeChanges, ResourceConstraints};

use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{get_json, set_json, MemoryCache, NoOpCache, ResultCache};
use crate::config::{ModelConfig, PipelineMlConfig, BUILD_OPTIMIZER};
use crate::errors::{Error, Result};
use crate::features::{feature_vector, FeatureMap};
use crate::model::evaluation::{mean_absolute_error, r2_score};
use crate::model::split::train_test_split;
use crate::model::{
    fit_scaled, try_model, Dataset, ModelSnapshot, PredictionSource, Scored,
    SnapshotCell,
};
use crate::service::HealthDescriptor;

/// Estimated duration with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEstimate {
    pub build_time: f64,
    pub confidence: f64,
    pub optimization_potential: f64,
    pub source: PredictionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOptimizationResponse {
    pub project_name: String,
    pub estimated_build_time: f64,
    pub confidence_score: f64,
    pub optimization_potential: f64,
    pub recommendations: BuildRecommendations,
    pub timestamp: String,
    pub model_version: String,
    pub source: PredictionSource,
}

/// A finished build and how long it took
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTrainingRecord {
    pub request: BuildOptimizationRequest,
    pub duration: f64,
}

/// Cache key over project, dependency set, change size and environment.
///
/// Test files, history and resource constraints are not part of the key, so
/// requests differing only in those share a cached result within the TTL.
pub fn cache_key(request: &BuildOptimizationRequest) -> String {
    let mut dependencies = request.dependencies.clone();
    dependencies.sort();
    let changes = &request.code_changes;

    // serde_json maps are sorted by key, so the encoding is stable
    let key_data = json!({
        "project_name": request.project_name,
        "dependencies_hash": sha256_hex(json!(dependencies).to_string().as_bytes()),
        "code_changes_hash": sha256_hex(
            format!("{}:{}:{}", changes.lines_added, changes.lines_deleted, changes.files_changed)
                .as_bytes()
        ),
        "target_environment": request.target_environment,
    });
    format!("build_opt:{}", sha256_hex(key_data.to_string().as_bytes()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub struct BuildOptimizer {
    model: ModelConfig,
    min_training_samples: usize,
    storage_path: PathBuf,
    state: SnapshotCell,
    cache: Box<dyn ResultCache>,
}

impl std::fmt::Debug for BuildOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOptimizer")
            .field("model", &self.model.name)
            .field("trained", &self.state.load().trained)
            .field("cached_results", &self.cache.len())
            .finish()
    }
}

impl BuildOptimizer {
    pub fn new(config: &PipelineMlConfig) -> Result<Self> {
        let cache: Box<dyn ResultCache> = if config.cache.enabled {
            Box::new(MemoryCache::new(Duration::from_secs(config.cache.ttl_secs)))
        } else {
            Box::new(NoOpCache)
        };
        let optimizer = Self::with_model_config(
            config.model_config(BUILD_OPTIMIZER)?,
            config.training.min_training_samples,
            cache,
        );
        let optimizer = Self {
            storage_path: config.training.model_storage_path.join(BUILD_OPTIMIZER),
            ..optimizer
        };
        optimizer.load_model();
        Ok(optimizer)
    }

    pub fn with_model_config(
        model: ModelConfig,
        min_training_samples: usize,
        cache: Box<dyn ResultCache>,
    ) -> Self {
        let state = SnapshotCell::new(ModelSnapshot::untrained(model.feature_columns.clone()));
        Self {
            model,
            min_training_samples,
            storage_path: PathBuf::from("./models").join(BUILD_OPTIMIZER),
            state,
            cache,
        }
    }

    /// Artifacts are not persisted; the optimizer always starts untrained
    pub fn load_model(&self) {
        tracing::info!(
            path = %self.storage_path.display(),
            "Model persistence disabled, starting with heuristic estimates"
        );
    }

    pub fn is_trained(&self) -> bool {
        self.state.load().trained
    }

    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.state.load()
    }

    pub fn install_snapshot(&self, snapshot: ModelSnapshot) {
        self.state.swap(snapshot);
        self.clear_cache();
    }

    pub fn clear_cache(&self) {
        if let Err(err) = self.cache.clear() {
            tracing::warn!(error = %err, "Failed to clear optimization cache");
        }
    }

    pub fn estimate(&self, features: &FeatureMap) -> BuildEstimate {
        Self::estimate_with(&self.state.load(), features)
    }

    fn estimate_with(snapshot: &ModelSnapshot, features: &FeatureMap) -> BuildEstimate {
        match try_model(BUILD_OPTIMIZER, snapshot, features) {
            Scored::Model(prediction) => BuildEstimate {
                build_time: f64::max(estimate::MIN_BUILD_SECONDS, prediction),
                confidence: estimate::model_confidence(features, prediction),
                optimization_potential: estimate::optimization_potential(features, prediction),
                source: PredictionSource::Model,
            },
            Scored::Fallback(reason) => BuildEstimate {
                build_time: estimate::heuristic_build_time(features),
                confidence: estimate::HEURISTIC_CONFIDENCE,
                optimization_potential: estimate::HEURISTIC_OPTIMIZATION_POTENTIAL,
                source: PredictionSource::heuristic(reason),
            },
        }
    }

    /// Estimate and recommend for one request, reusing a cached result for
    /// an identical request within the cache TTL
    pub fn optimize_build(&self, request: &BuildOptimizationRequest) -> BuildOptimizationResponse {
        let started = Instant::now();
        let key = cache_key(request);
        if let Some(cached) = get_json::<BuildOptimizationResponse>(self.cache.as_ref(), &key) {
            tracing::debug!(project = %request.project_name, "Returning cached optimization result");
            return cached;
        }

        let snapshot = self.state.load();
        let features = extract_features(request);
        let estimate = Self::estimate_with(&snapshot, &features);
        let recommendations = recommend::recommend(request, &features, estimate.build_time);

        let response = BuildOptimizationResponse {
            project_name: request.project_name.clone(),
            estimated_build_time: estimate.build_time,
            confidence_score: estimate.confidence,
            optimization_potential: estimate.optimization_potential,
            recommendations,
            timestamp: Utc::now().to_rfc3339(),
            model_version: snapshot.version(),
            source: estimate.source,
        };

        // a result scored against a replaced model must not outlive the swap
        match self
            .state
            .while_current(&snapshot, || set_json(self.cache.as_ref(), &key, &response))
        {
            Some(Err(err)) => tracing::warn!(error = %err, "Failed to cache optimization result"),
            Some(Ok(())) => {}
            None => tracing::debug!("Model replaced during optimization, result not cached"),
        }

        tracing::info!(
            project = %request.project_name,
            estimated_time = response.estimated_build_time,
            confidence = response.confidence_score,
            source = %response.source,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Build optimization completed"
        );
        response
    }

    pub fn optimize_batch(&self, requests: &[BuildOptimizationRequest]) -> Vec<BuildOptimizationResponse> {
        requests.par_iter().map(|r| self.optimize_build(r)).collect()
    }

    /// Fit a new duration regressor and swap it in.
    ///
    /// Returns mae, r2_score and training_samples. Cached results from the
    /// previous model are dropped on success.
    pub fn train(&self, records: &[BuildTrainingRecord]) -> Result<BTreeMap<String, f64>> {
        let _guard = self.state.training_guard();
        tracing::info!(samples = records.len(), "Starting build model training");

        if records.len() < self.min_training_samples {
            return Err(Error::InsufficientData {
                samples: records.len(),
                minimum: self.min_training_samples,
            });
        }
        if let Some(bad) = records
            .iter()
            .position(|r| r.duration < 0.0 || !r.duration.is_finite()) {
            return Err(Error::InvalidTrainingData(format!(
                "record {bad} has invalid duration {}",
                records[bad].duration
            )));
        }

        let columns = &self.model.feature_columns;
        let rows: Vec<Vec<f64>> = records
            .par_iter()
            .map(|r| feature_vector(&extract_features(&r.request), columns))
            .collect();
        let targets = records.iter().map(|r| r.duration).collect();
        let dataset = Dataset::new(rows, targets)?;

        let params = &self.model.training;
        let split = train_test_split(dataset.len(), params.validation_split);
        let train = dataset.select(&split.train);
        let test = dataset.select(&split.test);

        let (estimator, scaler, test_rows, _) =
            fit_scaled(self.model.estimator, params, &train, &test)?;
        let predictions = estimator.predict_many(&test_rows)?;

        let mae = mean_absolute_error(&test.targets, &predictions);
        let r2 = r2_score(&test.targets, &predictions);
        let metrics = BTreeMap::from([
            ("mae".to_string(), mae),
            ("r2_score".to_string(), r2),
            ("training_samples".to_string(), records.len() as f64),
        ]);

        self.state.swap(ModelSnapshot::trained(
            Arc::from(estimator),
            Some(scaler),
            columns.clone(),
            metrics.clone(),
            Utc::now(),
        ));
        self.clear_cache();

        tracing::info!(mae, r2_score = r2, samples = records.len(), "Model training completed");
        Ok(metrics)
    }

    pub fn health(&self) -> HealthDescriptor {
        HealthDescriptor::from_snapshot(BUILD_OPTIMIZER, &self.state.load())
    }
}
