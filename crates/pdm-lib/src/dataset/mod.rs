//! Tabular dataset handling
//!
//! This module provides the typed in-memory table for sensor telemetry,
//! CSV loading with a fixed column-exclusion configuration, stratified
//! train/test splitting, and exploratory summaries.

mod loader;
mod split;
mod summary;


pub use loader::{fingerprint, load, DatasetConfig, DEFAULT_EXCLUDED_COLUMNS, MISSING_MARKERS};
pub use split::{stratified_split, Split, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
pub use summary::{ColumnSummary, DatasetSummary};

use crate::error::LoadError;
use crate::models::{ColumnType, Label, Schema};
use ndarray::{Array2, ArrayView1, Axis};

/// Immutable table of feature rows, binary labels and optional failure types.
///
/// Missing feature cells are stored as `NaN`.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    features: Array2<f64>,
    labels: Vec<Label>,
    failure_types: Option<Vec<String>>,
    fingerprint: String,
}

impl Dataset {
    /// Build a dataset from in-memory columns, inferring column types.
    ///
    /// The fingerprint is derived from the numeric content, so two datasets
    /// built from identical values share an identity.
    pub fn from_parts(
        feature_names: Vec<String>,
        features: Array2<f64>,
        labels: Vec<Label>,
    ) -> Result<Self, LoadError> {
        if features.nrows() == 0 {
            return Err(LoadError::Empty);
        }
        if feature_names.is_empty() {
            return Err(LoadError::NoFeatures);
        }
        if features.ncols() != feature_names.len() || features.nrows() != labels.len() {
            return Err(LoadError::Misaligned {
                rows: features.nrows(),
                columns: features.ncols(),
                names: feature_names.len(),
                labels: labels.len(),
            });
        }

        let mut bytes = Vec::with_capacity(features.len() * 8 + labels.len());
        for value in features.iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend(labels.iter().map(|l| l.index() as u8));

        let types = infer_column_types(&features);
        Ok(Self {
            schema: Schema::new(feature_names, types),
            features,
            labels,
            failure_types: None,
            fingerprint: fingerprint(&bytes),
        })
    }

    pub(crate) fn from_loaded(
        schema: Schema,
        features: Array2<f64>,
        labels: Vec<Label>,
        failure_types: Option<Vec<String>>,
        fingerprint: String,
    ) -> Self {
        Self {
            schema,
            features,
            labels,
            failure_types,
            fingerprint,
        }
    }

    /// Attach the auxiliary multi-class failure type column
    pub fn with_failure_types(mut self, failure_types: Vec<String>) -> Self {
        if failure_types.len() == self.labels.len() {
            self.failure_types = Some(failure_types);
        }
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn feature_names(&self) -> &[String] {
        self.schema.names()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn failure_types(&self) -> Option<&[String]> {
        self.failure_types.as_deref()
    }

    /// SHA-256 of the source content, used as dataset identity
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.schema
            .position(name)
            .map(|i| self.features.column(i))
    }

    /// Fraction of rows labelled as failures
    pub fn positive_rate(&self) -> f64 {
        positive_rate(&self.labels)
    }

    /// Copy out the given rows as a feature matrix and label vector
    pub fn rows(&self, indices: &[usize]) -> (Array2<f64>, Vec<Label>) {
        let x = self.features.select(Axis(0), indices);
        let y = indices.iter().map(|&i| self.labels[i]).collect();
        (x, y)
    }

    /// Copy out the given rows restricted to the given column positions
    pub fn rows_with_columns(
        &self,
        indices: &[usize],
        columns: &[usize],
    ) -> (Array2<f64>, Vec<Label>) {
        let (x, y) = self.rows(indices);
        (x.select(Axis(1), columns), y)
    }

    /// Count of missing cells per feature column
    pub fn null_counts(&self) -> Vec<usize> {
        self.features
            .columns()
            .into_iter()
            .map(|col| col.iter().filter(|v| v.is_nan()).count())
            .collect()
    }
}

/// Fraction of failure labels, `0.0` for an empty slice
pub fn positive_rate(labels: &[Label]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    labels.iter().filter(|l| l.is_failure()).count() as f64 / labels.len() as f64
}

/// A column is `Integer` when every present value is integral
pub(crate) fn infer_column_types(features: &Array2<f64>) -> Vec<ColumnType> {
    features
        .columns()
        .into_iter()
        .map(|col| {
            let integral = col
                .iter()
                .filter(|v| !v.is_nan())
                .all(|v| v.fract() == 0.0 && v.is_finite());
            if integral {
                ColumnType::Integer
            } else {
                ColumnType::Float
            }
        })
        .collect()
}
