//! CSV dataset loading
//!
//! Reads a telemetry CSV into a [`Dataset`]. Feature columns are every
//! column except the label, the failure-type column and a fixed exclusion
//! list; nothing about the column set is inferred from the data.

use super::{infer_column_types, Dataset};
use crate::error::LoadError;
use crate::models::{Label, Schema};
use csv::{ReaderBuilder, Trim};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Identifier and leak columns never used as features
pub const DEFAULT_EXCLUDED_COLUMNS: &[&str] = &["Failure Type", "Product ID", "Type", "Target"];

/// Cell contents treated as a missing value
pub const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Column configuration for loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Binary 0/1 failure indicator
    pub label_column: String,
    /// Auxiliary multi-class column, loaded for exploration only
    pub failure_type_column: Option<String>,
    /// Columns dropped before the feature set is formed
    pub excluded_columns: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            label_column: "Target".to_string(),
            failure_type_column: Some("Failure Type".to_string()),
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DatasetConfig {
    fn is_feature(&self, column: &str) -> bool {
        column != self.label_column
            && self.failure_type_column.as_deref() != Some(column)
            && !self.excluded_columns.iter().any(|c| c == column)
    }
}

/// Load a dataset from a CSV file
pub fn load(path: impl AsRef<Path>, config: &DatasetConfig) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = from_bytes(&bytes, config)?;
    info!(
        path = %path.display(),
        rows = dataset.n_rows(),
        features = dataset.n_features(),
        positive_rate = dataset.positive_rate(),
        "Loaded dataset"
    );
    Ok(dataset)
}

impl Dataset {
    /// Load a dataset from any CSV reader
    pub fn from_reader<R: Read>(mut reader: R, config: &DatasetConfig) -> Result<Self, LoadError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|source| LoadError::Io {
            path: "<reader>".into(),
            source,
        })?;
        from_bytes(&bytes, config)
    }
}

/// Hex SHA-256 digest used as dataset identity
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn from_bytes(bytes: &[u8], config: &DatasetConfig) -> Result<Dataset, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let label_idx = headers
        .iter()
        .position(|h| h == config.label_column)
        .ok_or_else(|| LoadError::MissingColumn(config.label_column.clone()))?;
    let failure_type_idx = config
        .failure_type_column
        .as_deref()
        .and_then(|name| headers.iter().position(|h| h == name));

    let feature_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| config.is_feature(h))
        .map(|(i, _)| i)
        .collect();
    if feature_idx.is_empty() {
        return Err(LoadError::NoFeatures);
    }
    let feature_names: Vec<String> = feature_idx.iter().map(|&i| headers[i].to_string()).collect();
    debug!(columns = ?feature_names, "Resolved feature columns");

    let mut values = Vec::new();
    let mut labels = Vec::new();
    let mut failure_types = failure_type_idx.map(|_| Vec::new());

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        for (&idx, name) in feature_idx.iter().zip(&feature_names) {
            let cell = record.get(idx).unwrap_or_default();
            values.push(parse_cell(cell, line, name)?);
        }

        let label = match record.get(label_idx).unwrap_or_default() {
            "0" => Label::NoFailure,
            "1" => Label::Failure,
            other => {
                return Err(LoadError::InvalidLabel {
                    line,
                    value: other.to_string(),
                })
            }
        };
        labels.push(label);

        if let (Some(idx), Some(types)) = (failure_type_idx, failure_types.as_mut()) {
            types.push(record.get(idx).unwrap_or_default().to_string());
        }
    }

    if labels.is_empty() {
        return Err(LoadError::Empty);
    }

    let features = Array2::from_shape_vec((labels.len(), feature_names.len()), values)?;
    let types = infer_column_types(&features);
    Ok(Dataset::from_loaded(
        Schema::new(feature_names, types),
        features,
        labels,
        failure_types,
        fingerprint(bytes),
    ))
}

fn parse_cell(cell: &str, line: u64, column: &str) -> Result<f64, LoadError> {
    if MISSING_MARKERS.contains(&cell) {
        return Ok(f64::NAN);
    }
    // `inf` and friends parse as f64 but would poison the column statistics
    cell.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LoadError::InvalidValue {
            line,
            column: column.to_string(),
            value: cell.to_string(),
        })
}
