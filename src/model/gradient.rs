//! Gradient-descent linear models.
//!
//! One parameterisation serves both the build-time regressor (identity
//! link, squared loss) and the failure / test-selection classifiers
//! (sigmoid link, log loss): the gradient of either loss with respect to
//! the linear score is `prediction - target`.

use super::estimator::{Dataset, Estimator, FitSummary};
use crate::config::{EstimatorKind, TrainingParams};
use crate::errors::{Error, Result};
use crate::features::stats;

const PROBABILITY_EPS: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct GradientModel {
    kind: EstimatorKind,
    params: TrainingParams,
    weights: Vec<f64>,
    bias: f64,
}

impl GradientModel {
    pub fn new(kind: EstimatorKind, params: TrainingParams) -> Self {
        Self {
            kind,
            params,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn linear_regression(params: TrainingParams) -> Self {
        Self::new(EstimatorKind::LinearRegression, params)
    }

    pub fn logistic_regression(params: TrainingParams) -> Self {
        Self::new(EstimatorKind::LogisticRegression, params)
    }

    fn score(&self, row: &[f64]) -> f64 {
        let linear = self.bias
            + row
                .iter()
                .zip(&self.weights)
                .map(|(x, w)| x * w)
                .sum::<f64>();
        match self.kind {
            EstimatorKind::LinearRegression => linear,
            EstimatorKind::LogisticRegression => sigmoid(linear),
        }
    }

    fn loss(&self, data: &Dataset) -> f64 {
        let total: f64 = data
            .rows
            .iter()
            .zip(&data.targets)
            .map(|(row, &y)| {
                let p = self.score(row);
                match self.kind {
                    EstimatorKind::LinearRegression => (p - y).powi(2),
                    EstimatorKind::LogisticRegression => {
                        let p = p.clamp(PROBABILITY_EPS, 1.0 - PROBABILITY_EPS);
                        -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
                    }
                }
            })
            .sum();
        total / data.len() as f64
    }

    /// Per-sample weights; inverse class frequency when balancing is on
    fn sample_weights(&self, data: &Dataset) -> Vec<f64> {
        let balanced = self.params.balanced_classes
            && self.kind == EstimatorKind::LogisticRegression;
        if !balanced {
            return vec![1.0; data.len()];
        }
        let n = data.len() as f64;
        let positives = data.targets.iter().filter(|&&y| y >= 0.5).count() as f64;
        let negatives = n - positives;
        data.targets
            .iter()
            .map(|&y| {
                let class_count = if y >= 0.5 { positives } else { negatives };
                if class_count > 0.0 {
                    n / (2.0 * class_count)
                } else {
                    1.0
                }
            })
            .collect()
    }

    fn step(&mut self, data: &Dataset, batch: &[usize], weights: &[f64]) {
        let width = self.weights.len();
        let mut grad = vec![0.0; width];
        let mut grad_bias = 0.0;
        let mut total_weight = 0.0;

        for &i in batch {
            let row = &data.rows[i];
            let err = (self.score(row) - data.targets[i]) * weights[i];
            for (g, x) in grad.iter_mut().zip(row) {
                *g += err * x;
            }
            grad_bias += err;
            total_weight += weights[i];
        }

        if total_weight <= 0.0 {
            return;
        }
        let lr = self.params.learning_rate;
        let decay = self.params.weight_decay;
        for (w, g) in self.weights.iter_mut().zip(&grad) {
            *w -= lr * (g / total_weight + decay * *w);
        }
        self.bias -= lr * grad_bias / total_weight;
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Estimator for GradientModel {
    fn kind(&self) -> EstimatorKind {
        self.kind
    }

    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn fit(&mut self, train: &Dataset, validation: &Dataset) -> Result<FitSummary> {
        if train.is_empty() || validation.is_empty() {
            return Err(Error::Fit(format!(
                "need non-empty partitions, got {} train / {} validation",
                train.len(),
                validation.len()
            )));
        }
        if train.n_features() != validation.n_features() {
            return Err(Error::DimensionMismatch {
                expected: train.n_features(),
                actual: validation.n_features(),
            });
        }

        self.weights = vec![0.0; train.n_features()];
        self.bias = match self.kind {
            EstimatorKind::LinearRegression => stats::mean(&train.targets),
            EstimatorKind::LogisticRegression => 0.0,
        };

        let sample_weights = self.sample_weights(train);
        let indices: Vec<usize> = (0..train.len()).collect();
        let batch_size = match self.params.batch_size {
            0 => train.len(),
            n => n,
        };

        let mut best = (self.weights.clone(), self.bias);
        let mut best_loss = self.loss(validation);
        let mut best_epoch = 0;
        let mut patience_counter = 0;
        let mut epochs_run = 0;
        let mut stopped_early = false;

        for epoch in 1..=self.params.epochs {
            for batch in indices.chunks(batch_size) {
                self.step(train, batch, &sample_weights);
            }
            epochs_run = epoch;

            let val_loss = self.loss(validation);
            if !val_loss.is_finite() {
                return Err(Error::Fit(format!("validation loss diverged at epoch {epoch}")));
            }

            if val_loss < best_loss {
                best_loss = val_loss;
                best = (self.weights.clone(), self.bias);
                best_epoch = epoch;
                patience_counter = 0;
            } else {
                patience_counter += 1;
                if patience_counter >= self.params.early_stopping_patience {
                    tracing::debug!(epoch, "Early stopping");
                    stopped_early = true;
                    break;
                }
            }

            if epoch % 10 == 0 {
                tracing::trace!(epoch, val_loss, "Training progress");
            }
        }

        (self.weights, self.bias) = best;

        Ok(FitSummary {
            epochs_run,
            best_epoch,
            best_validation_loss: best_loss,
            stopped_early,
        })
    }

    fn predict(&self, row: &[f64]) -> Result<f64> {
        if self.weights.is_empty() {
            return Err(Error::Inference("estimator has not been fitted".to_string()));
        }
        if row.len() != self.weights.len() {
            return Err(Error::DimensionMismatch {
                expected: self.weights.len(),
                actual: row.len(),
            });
        }
        let score = self.score(row);
        if score.is_finite() {
            Ok(score)
        } else {
            Err(Error::Inference("non-finite model output".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(epochs: usize) -> TrainingParams {
        TrainingParams {
            epochs,
            batch_size: 0,
            learning_rate: 0.1,
            weight_decay: 0.0,
            early_stopping_patience: 5,
            validation_split: 0.2,
            balanced_classes: false,
        }
    }

    fn line(n: usize) -> Dataset {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 / n as f64]).collect();
        let targets = rows.iter().map(|r| 3.0 * r[0] + 1.0).collect();
        Dataset::new(rows, targets).unwrap()
    }

    #[test]
    fn test_regressor_learns_a_line() {
        let data = line(50);
        let mut model = GradientModel::linear_regression(params(2000));
        let summary = model.fit(&data, &data).unwrap();
        assert!(summary.best_validation_loss < 0.01);
        let p = model.predict(&[0.5]).unwrap();
        assert!((p - 2.5).abs() < 0.2, "prediction was {p}");
    }

    #[test]
    fn test_classifier_separates_classes() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![if i < 20 { -1.0 } else { 1.0 }]).collect();
        let targets = (0..40).map(|i| if i < 20 { 0.0 } else { 1.0 }).collect();
        let data = Dataset::new(rows, targets).unwrap();

        let mut model = GradientModel::logistic_regression(params(300));
        model.fit(&data, &data).unwrap();
        assert!(model.predict(&[1.0]).unwrap() > 0.8);
        assert!(model.predict(&[-1.0]).unwrap() < 0.2);
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = GradientModel::logistic_regression(params(1));
        assert!(matches!(model.predict(&[1.0]), Err(Error::Inference(_))));
    }

    #[test]
    fn test_wrong_width_fails() {
        let data = line(10);
        let mut model = GradientModel::linear_regression(params(3));
        model.fit(&data, &data).unwrap();
        assert!(matches!(
            model.predict(&[1.0, 2.0]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_validation_is_fit_error() {
        let data = line(10);
        let mut model = GradientModel::linear_regression(params(3));
        assert!(matches!(
            model.fit(&data, &Dataset::default()),
            Err(Error::Fit(_))
        ));
    }

    #[test]
    fn test_early_stopping_keeps_best_epoch() {
        // Constant targets: the bias starts at the optimum, so no epoch improves
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let data = Dataset::new(rows, vec![4.0; 10]).unwrap();
        let mut model = GradientModel::linear_regression(params(100));
        let summary = model.fit(&data, &data).unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.best_epoch, 0);
        assert_eq!(summary.epochs_run, 5);
        assert!((model.predict(&[3.0]).unwrap() - 4.0).abs() < 1e-12);
    }
}
