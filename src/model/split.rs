//! Deterministic train/test partitioning.
//!
//! Test rows are spread evenly across the input order instead of drawn at
//! random, so repeated training on the same records is reproducible.

/// Indices for the train and test partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn clamp_count(n: usize, wanted: usize) -> usize {
    if n < 2 {
        return 0;
    }
    wanted.clamp(1, n - 1)
}

/// Evenly spaced selection of `k` positions out of `n`
fn spread(n: usize, k: usize) -> Vec<usize> {
    (0..k).map(|j| (j * n + n / 2) / k.max(1)).map(|i| i.min(n - 1)).collect()
}

fn split_members(members: &[usize], k: usize) -> Split {
    let mut is_test = vec![false; members.len()];
    for pos in spread(members.len(), k) {
        is_test[pos] = true;
    }
    let (test, train): (Vec<(usize, bool)>, Vec<(usize, bool)>) = members
        .iter()
        .copied()
        .zip(is_test)
        .partition(|&(_, t)| t);
    Split {
        train: train.into_iter().map(|(i, _)| i).collect(),
        test: test.into_iter().map(|(i, _)| i).collect(),
    }
}

/// Split `n` rows, holding out `ceil(n * test_fraction)` for testing
pub fn train_test_split(n: usize, test_fraction: f64) -> Split {
    let all: Vec<usize> = (0..n).collect();
    let k = clamp_count(n, (n as f64 * test_fraction).ceil() as usize);
    split_members(&all, k)
}

/// Split per class so both partitions keep the label proportions.
///
/// Each class contributes `round(count * test_fraction)` rows, at least one
/// when the class has two or more members.
pub fn stratified_split(labels: &[f64], test_fraction: f64) -> Split {
    let (positives, negatives): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| labels[i] >= 0.5);

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for class in [negatives, positives] {
        let k = clamp_count(class.len(), (class.len() as f64 * test_fraction).round() as usize);
        let part = split_members(&class, k);
        train.extend(part.train);
        test.extend(part.test);
    }
    train.sort_unstable();
    test.sort_unstable();
    Split { train, test }
}
