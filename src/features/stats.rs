//! Summary statistics over short metric histories.

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`)
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Ordinary-least-squares slope of value against index.
///
/// Returns 0.0 for fewer than two points or a non-finite result.
pub fn trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values);

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

    let slope = num / den;
    if slope.is_finite() {
        slope
    } else {
        0.0
    }
}

/// The trailing `n` entries of `values`
pub fn last_n(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(variance(&values), 4.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(trend(&[]), 0.0);
        assert_eq!(trend(&[42.0]), 0.0);
    }

    #[test]
    fn test_trend_of_line() {
        assert!((trend(&[1.0, 3.0, 5.0, 7.0]) - 2.0).abs() < 1e-12);
        assert!((trend(&[10.0, 8.0, 6.0]) + 2.0).abs() < 1e-12);
        assert_eq!(trend(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_last_n() {
        let values: Vec<f64> = (0..30).map(f64::from).collect();
        let tail = last_n(&values, 20);
        assert_eq!(tail.len(), 20);
        assert_eq!(tail[0], 10.0);
        assert_eq!(last_n(&values[..3], 20).len(), 3);
    }
}
