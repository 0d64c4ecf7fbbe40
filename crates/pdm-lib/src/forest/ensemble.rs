//! Bagged tree ensemble

use super::tree::{grow, DecisionTree, TreeSettings};
use super::Classifier;
use crate::error::TrainError;
use crate::models::Label;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Trees in the ensemble unless configured otherwise
pub const DEFAULT_TREES: usize = 100;

/// Number of features considered when growing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `round(sqrt(n_features))`, at least one
    Sqrt,
    All,
    Fixed(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().round() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Where the feature subset is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSampling {
    /// One subset per tree; every split in the tree searches that subset
    PerTree,
    /// A fresh subset at every split
    PerSplit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// `n_samples / (n_classes * class_count)`
    Balanced,
    Uniform,
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_features: MaxFeatures,
    pub feature_sampling: FeatureSampling,
    pub class_weight: ClassWeight,
    /// Resample rows with replacement for each tree
    pub bootstrap: bool,
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_TREES,
            seed: 42,
            max_features: MaxFeatures::Sqrt,
            feature_sampling: FeatureSampling::PerTree,
            class_weight: ClassWeight::Balanced,
            bootstrap: true,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

impl ForestParams {
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_feature_sampling(mut self, feature_sampling: FeatureSampling) -> Self {
        self.feature_sampling = feature_sampling;
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// A fitted random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    importances: Vec<f64>,
    class_weights: [f64; 2],
}

impl RandomForest {
    /// Fit a forest on a complete (no `NaN`) feature matrix
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[Label],
        params: &ForestParams,
    ) -> Result<Self, TrainError> {
        let (n, d) = x.dim();
        if n == 0 || d == 0 {
            return Err(TrainError::EmptyTrainingSet);
        }
        if n != y.len() {
            return Err(TrainError::LabelMismatch {
                rows: n,
                labels: y.len(),
            });
        }
        if params.n_trees == 0 {
            return Err(TrainError::NoTrees);
        }

        let start = Instant::now();
        let classes: Vec<usize> = y.iter().map(|l| l.index()).collect();
        let class_weights = compute_class_weights(&classes, params.class_weight);
        let k = params.max_features.resolve(d);

        let mut master = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);
        let mut importances = vec![0.0; d];

        for t in 0..params.n_trees {
            let mut rng = StdRng::seed_from_u64(master.random::<u64>());

            let mut weights = vec![0.0; n];
            if params.bootstrap {
                for _ in 0..n {
                    weights[rng.random_range(0..n)] += 1.0;
                }
            } else {
                weights.iter_mut().for_each(|w| *w = 1.0);
            }
            for (w, &c) in weights.iter_mut().zip(&classes) {
                *w *= class_weights[c];
            }

            let (pool, per_node) = match params.feature_sampling {
                FeatureSampling::PerTree => {
                    let mut pool = index::sample(&mut rng, d, k).into_vec();
                    pool.sort_unstable();
                    let len = pool.len();
                    (pool, len)
                }
                FeatureSampling::PerSplit => ((0..d).collect(), k),
            };

            let settings = TreeSettings {
                max_features: per_node,
                min_samples_split: params.min_samples_split.max(2),
                max_depth: params.max_depth,
            };
            let grown = grow(x, &classes, &weights, &pool, &settings, &mut rng);

            let total: f64 = grown.importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&grown.importances) {
                    *acc += v / total;
                }
            }
            debug!(
                tree = t,
                nodes = grown.tree.n_nodes(),
                depth = grown.tree.depth(),
                "Grew tree"
            );
            trees.push(grown.tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        info!(
            trees = trees.len(),
            rows = n,
            features = d,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted random forest"
        );

        Ok(Self {
            trees,
            n_features: d,
            importances,
            class_weights,
        })
    }

    /// Impurity-decrease importance per input column, summing to 1
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Per-class sample weight multipliers used during fitting
    pub fn class_weights(&self) -> [f64; 2] {
        self.class_weights
    }

    /// Number of trees voting failure for the row
    pub fn failure_votes(&self, row: ArrayView1<'_, f64>) -> usize {
        self.trees.iter().filter(|t| t.votes_failure(row)).count()
    }

    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.failure_probability(row)).collect()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn failure_probability(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.failure_votes(row) as f64 / self.trees.len() as f64
    }
}

fn compute_class_weights(classes: &[usize], mode: ClassWeight) -> [f64; 2] {
    match mode {
        ClassWeight::Uniform => [1.0, 1.0],
        ClassWeight::Balanced => {
            let mut counts = [0usize; 2];
            for &c in classes {
                counts[c] += 1;
            }
            let present = counts.iter().filter(|&&c| c > 0).count().max(1);
            let n = classes.len() as f64;
            let mut weights = [0.0; 2];
            for (w, &count) in weights.iter_mut().zip(&counts) {
                if count > 0 {
                    *w = n / (present as f64 * count as f64);
                }
            }
            weights
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    /// Failures whenever column 0 exceeds 0.8; column 1 is noise
    fn threshold_data(n: usize) -> (Array2<f64>, Vec<Label>) {
        let mut rng = StdRng::seed_from_u64(11);
        let x = Array2::from_shape_fn((n, 2), |_| rng.random::<f64>());
        let y = x.rows().into_iter().map(|r| Label::from_flag(r[0] > 0.8)).collect();
        (x, y)
    }

    #[test]
    fn test_balanced_class_weights() {
        let classes = vec![0, 0, 0, 1];
        let w = compute_class_weights(&classes, ClassWeight::Balanced);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
        assert_eq!(compute_class_weights(&classes, ClassWeight::Uniform), [1.0, 1.0]);
    }

    #[test]
    fn test_forest_reports_fitted_class_weights() {
        let (x, y) = threshold_data(200);
        let failures = y.iter().filter(|l| l.is_failure()).count() as f64;
        let balanced = RandomForest::fit(x.view(), &y, &ForestParams::default().with_n_trees(3))
            .unwrap();
        let [w_ok, w_fail] = balanced.class_weights();
        assert!((w_fail - 200.0 / (2.0 * failures)).abs() < 1e-12);
        assert!((w_ok - 200.0 / (2.0 * (200.0 - failures))).abs() < 1e-12);

        let params = ForestParams::default()
            .with_n_trees(3)
            .with_class_weight(ClassWeight::Uniform);
        let uniform = RandomForest::fit(x.view(), &y, &params).unwrap();
        assert_eq!(uniform.class_weights(), [1.0, 1.0]);
    }

    #[test]
    fn test_max_depth_bounds_every_tree() {
        let (x, y) = threshold_data(300);
        let params = ForestParams::default()
            .with_n_trees(6)
            .with_max_depth(Some(2));
        let forest = RandomForest::fit(x.view(), &y, &params).unwrap();
        assert!(forest.trees().iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(6), 2);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::All.resolve(6), 6);
        assert_eq!(MaxFeatures::Fixed(10).resolve(6), 6);
    }

    #[test]
    fn test_forest_learns_threshold() {
        let (x, y) = threshold_data(400);
        let params = ForestParams::default()
            .with_n_trees(15)
            .with_max_features(MaxFeatures::All);
        let forest = RandomForest::fit(x.view(), &y, &params).unwrap();

        assert_eq!(forest.n_trees(), 15);
        assert!(forest.failure_probability(array![0.95, 0.5].view()) > 0.5);
        assert!(forest.failure_probability(array![0.10, 0.5].view()) < 0.5);
        assert!(forest.importances()[0] > forest.importances()[1]);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = threshold_data(200);
        for sampling in [FeatureSampling::PerTree, FeatureSampling::PerSplit] {
            let params = ForestParams::default()
                .with_n_trees(10)
                .with_feature_sampling(sampling);
            let forest = RandomForest::fit(x.view(), &y, &params).unwrap();
            let total: f64 = forest.importances().iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = threshold_data(150);
        let params = ForestParams::default().with_n_trees(8).with_seed(5);
        let a = RandomForest::fit(x.view(), &y, &params).unwrap();
        let b = RandomForest::fit(x.view(), &y, &params).unwrap();
        assert_eq!(a.importances(), b.importances());
        assert_eq!(a.predict_proba(x.view()), b.predict_proba(x.view()));
    }

    #[test]
    fn test_probability_is_vote_fraction() {
        let (x, y) = threshold_data(100);
        let params = ForestParams::default().with_n_trees(7);
        let forest = RandomForest::fit(x.view(), &y, &params).unwrap();
        for row in x.rows() {
            let p = forest.failure_probability(row);
            let votes = forest.failure_votes(row);
            assert_eq!(p, votes as f64 / 7.0);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        let x = Array2::<f64>::zeros((0, 3));
        assert_eq!(
            RandomForest::fit(x.view(), &[], &ForestParams::default()).unwrap_err(),
            TrainError::EmptyTrainingSet
        );

        let x = Array2::<f64>::zeros((2, 1));
        assert!(matches!(
            RandomForest::fit(x.view(), &[Label::Failure], &ForestParams::default()),
            Err(TrainError::LabelMismatch { .. })
        ));
        assert_eq!(
            RandomForest::fit(
                x.view(),
                &[Label::Failure, Label::NoFailure],
                &ForestParams::default().with_n_trees(0)
            )
            .unwrap_err(),
            TrainError::NoTrees
        );
    }
}
