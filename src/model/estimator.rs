use std::fmt;

use crate::config::EstimatorKind;
use crate::errors::{Error, Result};

/// Row-major feature matrix with one target per row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn new(rows: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(Error::InvalidTrainingData(format!(
                "{} feature rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if let Some(width) = rows.first().map(Vec::len) {
            if let Some(bad) = rows.iter().position(|r| r.len() != width) {
                return Err(Error::InvalidTrainingData(format!(
                    "row {bad} has {} features, expected {width}",
                    rows[bad].len()
                )));
            }
        }
        let finite = rows.iter().flatten().chain(targets.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(Error::InvalidTrainingData(
                "non-finite feature or target value".to_string(),
            ));
        }
        Ok(Self { rows, targets })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Subset by row indices, preserving the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

/// Outcome of an early-stopped fit
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_validation_loss: f64,
    pub stopped_early: bool,
}

/// Trainable predictor.
///
/// `fit` keeps the parameters from the epoch with the lowest validation
/// loss. `predict` takes an already-scaled row in the column order the
/// estimator was fitted on.
pub trait Estimator: Send + Sync + fmt::Debug {
    fn kind(&self) -> EstimatorKind;

    /// Width of the rows the estimator was fitted on; 0 before fitting
    fn n_features(&self) -> usize;

    fn fit(&mut self, train: &Dataset, validation: &Dataset) -> Result<FitSummary>;

    fn predict(&self, row: &[f64]) -> Result<f64>;

    fn predict_many(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}
