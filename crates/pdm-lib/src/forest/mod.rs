//! Random forest classifier
//!
//! Bagged CART trees with feature subsampling and class-balanced sample
//! weights. Used both by the importance ranker and as the final stage of
//! the inference pipeline.

mod ensemble;
mod tree;

pub use ensemble::{
    ClassWeight, FeatureSampling, ForestParams, MaxFeatures, RandomForest, DEFAULT_TREES,
};
pub use tree::DecisionTree;

use crate::models::Prediction;
use ndarray::ArrayView1;

/// Trait for binary failure classifiers
pub trait Classifier {
    /// Number of input columns the classifier expects
    fn n_features(&self) -> usize;

    /// Failure probability in `[0, 1]` for one input row
    fn failure_probability(&self, row: ArrayView1<'_, f64>) -> f64;

    /// Label and probability for one input row
    fn classify(&self, row: ArrayView1<'_, f64>) -> Prediction {
        Prediction::from_probability(self.failure_probability(row))
    }
}
