//! Feature importance ranking
//!
//! Fits a preliminary forest on every feature and orders the features by
//! their share of the total impurity decrease.

use crate::error::TrainError;
use crate::forest::{ForestParams, RandomForest};
use crate::models::Label;
use crate::pipeline::MedianImputer;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Features kept by [`FeatureRanking::select_top`] unless configured otherwise
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub score: f64,
}

/// Features sorted by descending importance; ties keep column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRanking {
    entries: Vec<FeatureImportance>,
}

impl FeatureRanking {
    /// Build from per-column scores in column order
    pub fn from_scores(names: &[String], scores: &[f64]) -> Self {
        let mut entries: Vec<FeatureImportance> = names
            .iter()
            .zip(scores)
            .map(|(name, &score)| FeatureImportance {
                name: name.clone(),
                score,
            })
            .collect();
        // Stable sort: equal scores stay in column order
        entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Self { entries }
    }

    pub fn entries(&self) -> &[FeatureImportance] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.score).sum()
    }

    /// Names of the `k` highest-scoring features, best first
    pub fn select_top(&self, k: usize) -> Vec<String> {
        self.entries.iter().take(k).map(|e| e.name.clone()).collect()
    }
}

/// Rank features on the training rows.
///
/// Missing cells are filled with training medians first, since the forest
/// cannot split on them.
pub fn rank(
    x: ArrayView2<'_, f64>,
    y: &[Label],
    feature_names: &[String],
    params: &ForestParams,
) -> Result<FeatureRanking, TrainError> {
    if x.ncols() != feature_names.len() {
        return Err(TrainError::NameMismatch {
            columns: x.ncols(),
            names: feature_names.len(),
        });
    }
    let filled = MedianImputer::fit(x).transform(x);
    let forest = RandomForest::fit(filled.view(), y, params)?;
    let ranking = FeatureRanking::from_scores(feature_names, forest.importances());

    if let Some(top) = ranking.entries().first() {
        info!(top_feature = %top.name, score = top.score, "Ranked features");
    }
    Ok(ranking)
}
