//! Hold-out metrics reported by training runs.

/// Binary predictions at the 0.5 threshold
pub fn threshold(probabilities: &[f64]) -> Vec<bool> {
    probabilities.iter().map(|&p| p > 0.5).collect()
}

struct Confusion {
    tp: f64,
    fp: f64,
    fn_: f64,
    tn: f64,
}

fn confusion(labels: &[f64], predicted: &[bool]) -> Confusion {
    let mut c = Confusion {
        tp: 0.0,
        fp: 0.0,
        fn_: 0.0,
        tn: 0.0,
    };
    for (&y, &p) in labels.iter().zip(predicted) {
        match (y >= 0.5, p) {
            (true, true) => c.tp += 1.0,
            (false, true) => c.fp += 1.0,
            (true, false) => c.fn_ += 1.0,
            (false, false) => c.tn += 1.0,
        }
    }
    c
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

pub fn precision(labels: &[f64], predicted: &[bool]) -> f64 {
    let c = confusion(labels, predicted);
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall(labels: &[f64], predicted: &[bool]) -> f64 {
    let c = confusion(labels, predicted);
    ratio(c.tp, c.tp + c.fn_)
}

pub fn f1_score(labels: &[f64], predicted: &[bool]) -> f64 {
    let p = precision(labels, predicted);
    let r = recall(labels, predicted);
    ratio(2.0 * p * r, p + r)
}

pub fn accuracy(labels: &[f64], predicted: &[bool]) -> f64 {
    let c = confusion(labels, predicted);
    ratio(c.tp + c.tn, labels.len() as f64)
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged.
///
/// `None` when only one class is present.
pub fn roc_auc(labels: &[f64], scores: &[f64]) -> Option<f64> {
    let positives = labels.iter().filter(|&&y| y >= 0.5).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based average rank for the tie group i..=j
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|&(&y, _)| y >= 0.5)
        .map(|(_, &r)| r)
        .sum();
    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Coefficient of determination; a constant target scores 1.0 only when
/// predicted exactly, else 0.0
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
