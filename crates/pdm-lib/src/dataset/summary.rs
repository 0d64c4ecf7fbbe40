//! Exploratory dataset summaries: shape, null counts, column types,
//! per-feature ranges and label/failure-type distributions.

use super::Dataset;
use crate::models::{ColumnType, Label};
use crate::pipeline::median;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-column statistics over the present (non-missing) values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub column_type: ColumnType,
    pub null_count: usize,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub n_rows: usize,
    pub n_features: usize,
    pub columns: Vec<ColumnSummary>,
    pub label_counts: Vec<(Label, usize)>,
    /// Failure-type counts, most frequent first; empty without that column
    pub failure_types: Vec<(String, usize)>,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let nulls = dataset.null_counts();
        let columns = dataset
            .feature_names()
            .iter()
            .zip(dataset.schema().types())
            .zip(dataset.features().columns())
            .zip(nulls)
            .map(|(((name, &column_type), col), null_count)| {
                let mut present: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
                let min = present.iter().copied().reduce(f64::min);
                let max = present.iter().copied().reduce(f64::max);
                let mean = if present.is_empty() {
                    None
                } else {
                    Some(present.iter().sum::<f64>() / present.len() as f64)
                };
                ColumnSummary {
                    name: name.clone(),
                    column_type,
                    null_count,
                    min,
                    median: median(&mut present),
                    max,
                    mean,
                }
            })
            .collect();

        let label_counts = Label::ALL
            .iter()
            .map(|&label| {
                let count = dataset.labels().iter().filter(|&&l| l == label).count();
                (label, count)
            })
            .collect();

        let mut failure_types: Vec<(String, usize)> = dataset
            .failure_types()
            .map(|types| {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for t in types {
                    *counts.entry(t.as_str()).or_default() += 1;
                }
                counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
            })
            .unwrap_or_default();
        failure_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            n_rows: dataset.n_rows(),
            n_features: dataset.n_features(),
            columns,
            label_counts,
            failure_types,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl Dataset {
    /// First `n` rows, missing cells as `None`
    pub fn head(&self, n: usize) -> Vec<Vec<Option<f64>>> {
        self.features()
            .rows()
            .into_iter()
            .take(n)
            .map(|row| row.iter().map(|&v| if v.is_nan() { None } else { Some(v) }).collect())
            .collect()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_dataset(self)
    }
}
