use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::features::stats;

/// Per-column standardisation to zero mean and unit variance.
///
/// Columns with zero variance are centred but not scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on training rows only; validation data must not leak in here
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::Fit("cannot fit scaler on zero rows".to_string()))?;

        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for col in 0..width {
            let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            let sd = stats::std_dev(&column);
            means.push(stats::mean(&column));
            scales.push(if sd > f64::EPSILON { sd } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(Error::DimensionMismatch {
                expected: self.means.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardises_columns() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.transform(&[1.0, 10.0]).unwrap(), vec![-1.0, 0.0]);
        assert_eq!(scaler.transform(&[3.0, 12.0]).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]).unwrap();
        let err = scaler.transform(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_empty_fit_fails() {
        assert!(StandardScaler::fit(&[]).is_err());
    }
}
