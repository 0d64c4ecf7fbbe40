//! Error types for loading, training and prediction

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a dataset. Always fatal: no partial dataset is produced.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("line {line}: label '{value}' is not 0 or 1")]
    InvalidLabel { line: u64, value: String },

    #[error("dataset contains no rows")]
    Empty,

    #[error("no feature columns remain after exclusions")]
    NoFeatures,

    #[error("{rows}x{columns} feature matrix does not match {names} names and {labels} labels")]
    Misaligned {
        rows: usize,
        columns: usize,
        names: usize,
        labels: usize,
    },

    #[error("feature matrix shape mismatch: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// A record does not match the schema the pipeline was trained on
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("record is missing feature '{0}' required by the trained pipeline")]
    MissingFeature(String),

    #[error("expected {expected} feature values, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),

    #[error("need at least 2 rows to split, got {0}")]
    TooFewRows(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature matrix has {rows} rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("feature matrix has {columns} columns but {names} feature names")]
    NameMismatch { columns: usize, names: usize },

    #[error("forest needs at least one tree")]
    NoTrees,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("pipeline has not been fitted")]
    NotFitted,

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Any failure surfaced by a [`crate::Session`]
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
