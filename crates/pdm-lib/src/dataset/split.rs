//! Stratified train/test splitting

use crate::error::SplitError;
use crate::models::Label;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Share of rows held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Seed for the shuffle, fixed so runs are reproducible
pub const DEFAULT_SEED: u64 = 42;

/// Disjoint row-index partitions, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition row indices into train/test sets preserving class proportions.
///
/// The test set holds `ceil(n * test_fraction)` rows. Each class contributes
/// its proportional share, with leftover slots handed out by largest
/// remainder. A class with two or more rows always keeps one in training.
pub fn stratified_split(
    labels: &[Label],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, SplitError> {
    let n = labels.len();
    if n < 2 {
        return Err(SplitError::TooFewRows(n));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }

    // Guard against 0.2 * 10_000 landing a hair above 2000
    let n_test = ((n as f64 * test_fraction) - 1e-9).ceil() as usize;
    let n_test = n_test.clamp(1, n - 1);

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); Label::ALL.len()];
    for (i, label) in labels.iter().enumerate() {
        by_class[label.index()].push(i);
    }

    let quotas = allocate_test_quotas(&by_class, n, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (mut indices, quota) in by_class.into_iter().zip(quotas) {
        indices.shuffle(&mut rng);
        test.extend_from_slice(&indices[..quota]);
        train.extend_from_slice(&indices[quota..]);
    }
    train.sort_unstable();
    test.sort_unstable();

    info!(
        train_rows = train.len(),
        test_rows = test.len(),
        seed,
        "Split dataset"
    );
    Ok(Split { train, test })
}

fn allocate_test_quotas(by_class: &[Vec<usize>], n: usize, n_test: usize) -> Vec<usize> {
    let capacity: Vec<usize> = by_class
        .iter()
        .map(|rows| if rows.len() >= 2 { rows.len() - 1 } else { 0 })
        .collect();

    let exact: Vec<f64> = by_class
        .iter()
        .map(|rows| rows.len() as f64 * n_test as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = exact
        .iter()
        .zip(&capacity)
        .map(|(e, &cap)| (e.floor() as usize).min(cap))
        .collect();

    let mut order: Vec<usize> = (0..by_class.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut assigned: usize = quotas.iter().sum();
    while assigned < n_test {
        let mut progressed = false;
        for &class in &order {
            if assigned == n_test {
                break;
            }
            if quotas[class] < capacity[class] {
                quotas[class] += 1;
                assigned += 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    quotas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(negatives: usize, positives: usize) -> Vec<Label> {
        let mut out = vec![Label::NoFailure; negatives];
        out.extend(vec![Label::Failure; positives]);
        out
    }

    #[test]
    fn test_split_sizes_and_ratio() {
        let y = labels(9_700, 300);
        let split = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(split.train.len(), 8_000);
        assert_eq!(split.test.len(), 2_000);
        let positives = split.test.iter().filter(|&&i| y[i].is_failure()).count();
        assert_eq!(positives, 60);
    }

    #[test]
    fn test_split_is_deterministic() {
        let y = labels(500, 120);
        let a = stratified_split(&y, 0.2, 7).unwrap();
        let b = stratified_split(&y, 0.2, 7).unwrap();
        assert_eq!(a, b);
        let c = stratified_split(&y, 0.2, 8).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_every_row_in_exactly_one_partition() {
        let y = labels(77, 23);
        let split = stratified_split(&y, 0.3, 1).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_minority_row_stays_in_train() {
        let y = labels(20, 1);
        let split = stratified_split(&y, 0.5, 42).unwrap();
        assert!(split.train.contains(&20));
        assert_eq!(split.test.len(), 11);
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            stratified_split(&labels(1, 0), 0.2, 42),
            Err(SplitError::TooFewRows(1))
        );
        assert_eq!(
            stratified_split(&labels(10, 10), 1.0, 42),
            Err(SplitError::InvalidFraction(1.0))
        );
        assert!(stratified_split(&labels(10, 10), 0.0, 42).is_err());
    }
}
