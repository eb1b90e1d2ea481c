//! Trained-model state shared by the prediction services.
//!
//! Each service owns a [`SnapshotCell`]. Predictions take a cheap clone of
//! the current [`ModelSnapshot`] and score against it without holding any
//! lock; training builds a complete replacement off to the side and swaps it
//! in with a single pointer write, so readers see either the old state or the
//! new one and never a mix.

pub mod estimator;
pub mod evaluation;
pub mod gradient;
pub mod scaler;
pub mod split;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use estimator::{Dataset, Estimator, FitSummary};
pub use gradient::GradientModel;
pub use scaler::StandardScaler;

use crate::config::{EstimatorKind, TrainingParams};
use crate::errors::{Error, Result};
use crate::features::{feature_vector, FeatureMap};

pub const UNTRAINED_VERSION: &str = "v0.0.0";

/// Immutable view of one service's model
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub trained: bool,
    pub model: Option<Arc<dyn Estimator>>,
    pub scaler: Option<StandardScaler>,
    pub feature_names: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
    pub last_training_time: Option<DateTime<Utc>>,
}

impl ModelSnapshot {
    pub fn untrained(feature_names: Vec<String>) -> Self {
        Self {
            trained: false,
            model: None,
            scaler: None,
            feature_names,
            metrics: BTreeMap::new(),
            last_training_time: None,
        }
    }

    /// Snapshot produced by a successful training run
    pub fn trained(
        model: Arc<dyn Estimator>,
        scaler: Option<StandardScaler>,
        feature_names: Vec<String>,
        metrics: BTreeMap<String, f64>,
        trained_at: DateTime<Utc>,
    ) -> Self {
        Self {
            trained: true,
            model: Some(model),
            scaler,
            feature_names,
            metrics,
            last_training_time: Some(trained_at),
        }
    }

    /// `v%Y%m%d_%H%M%S` of the last training time, or `v0.0.0`
    pub fn version(&self) -> String {
        model_version(self.last_training_time)
    }

    /// Run the model on one feature map.
    ///
    /// The vector follows `feature_names`; the scaler is applied when the
    /// snapshot carries one.
    pub fn score(&self, features: &FeatureMap) -> Result<f64> {
        let model = match (&self.model, self.trained) {
            (Some(model), true) => model,
            _ => return Err(Error::Inference("no trained model loaded".to_string())),
        };
        let raw = feature_vector(features, &self.feature_names);
        let row = match &self.scaler {
            Some(scaler) => scaler.transform(&raw)?,
            None => raw,
        };
        model.predict(&row)
    }
}

pub fn model_version(last_training_time: Option<DateTime<Utc>>) -> String {
    match last_training_time {
        Some(at) => at.format("v%Y%m%d_%H%M%S").to_string(),
        None => UNTRAINED_VERSION.to_string(),
    }
}

/// Atomically replaceable snapshot plus the lock that serialises training
#[derive(Debug)]
pub struct SnapshotCell {
    current: RwLock<Arc<ModelSnapshot>>,
    training: Mutex<()>,
}

impl SnapshotCell {
    pub fn new(snapshot: ModelSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            training: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Arc<ModelSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn swap(&self, snapshot: ModelSnapshot) -> Arc<ModelSnapshot> {
        std::mem::replace(&mut *self.current.write(), Arc::new(snapshot))
    }

    /// Run `f` only while `snapshot` is still the current one.
    ///
    /// The read lock is held across `f`, so no swap lands in between. `f`
    /// must not call back into this cell.
    pub fn while_current<R>(&self, snapshot: &Arc<ModelSnapshot>, f: impl FnOnce() -> R) -> Option<R> {
        let current = self.current.read();
        Arc::ptr_eq(&*current, snapshot).then(f)
    }

    /// Held for the whole training run; a second trainer blocks here
    pub fn training_guard(&self) -> MutexGuard<'_, ()> {
        self.training.lock()
    }
}

/// Why a prediction did not come from the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    Untrained,
    ModelFailed(String),
}

/// Which path produced a prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    Heuristic { fallback: FallbackReason },
}

impl PredictionSource {
    pub fn heuristic(reason: FallbackReason) -> Self {
        Self::Heuristic { fallback: reason }
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model)
    }
}

impl fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Heuristic {
                fallback: FallbackReason::Untrained,
            } => write!(f, "heuristic (untrained)"),
            Self::Heuristic {
                fallback: FallbackReason::ModelFailed(msg),
            } => write!(f, "heuristic (model failed: {msg})"),
        }
    }
}

/// Outcome of trying the model for one request
pub enum Scored {
    Model(f64),
    Fallback(FallbackReason),
}

/// Score with the snapshot model, turning every failure into a fallback.
///
/// Errors are logged at `warn` and never returned.
pub fn try_model(service: &str, snapshot: &ModelSnapshot, features: &FeatureMap) -> Scored {
    if !snapshot.trained || snapshot.model.is_none() {
        return Scored::Fallback(FallbackReason::Untrained);
    }
    match snapshot.score(features) {
        Ok(value) => Scored::Model(value),
        Err(err) => {
            tracing::warn!(service, error = %err, "Model prediction failed, using heuristic");
            Scored::Fallback(FallbackReason::ModelFailed(err.to_string()))
        }
    }
}

pub fn build_estimator(kind: EstimatorKind, params: TrainingParams) -> Box<dyn Estimator> {
    Box::new(GradientModel::new(kind, params))
}

/// Scale and fit on an already split dataset.
///
/// Returns the fitted estimator, the scaler fit on `train` only, and the
/// scaled validation rows for metric computation.
pub fn fit_scaled(
    kind: EstimatorKind,
    params: &TrainingParams,
    train: &Dataset,
    validation: &Dataset,
) -> Result<(Box<dyn Estimator>, StandardScaler, Vec<Vec<f64>>, FitSummary)> {
    let scaler = StandardScaler::fit(&train.rows)?;
    let train_scaled = Dataset {
        rows: scaler.transform_all(&train.rows)?,
        targets: train.targets.clone(),
    };
    let validation_rows = scaler.transform_all(&validation.rows)?;
    let validation_scaled = Dataset {
        rows: validation_rows.clone(),
        targets: validation.targets.clone(),
    };

    let mut estimator = build_estimator(kind, params.clone());
    let summary = estimator.fit(&train_scaled, &validation_scaled)?;
    tracing::info!(
        epochs_run = summary.epochs_run,
        best_epoch = summary.best_epoch,
        best_validation_loss = summary.best_validation_loss,
        stopped_early = summary.stopped_early,
        "Estimator fitted"
    );
    Ok((estimator, scaler, validation_rows, summary))
}
