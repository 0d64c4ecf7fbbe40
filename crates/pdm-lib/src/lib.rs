//! Predictive maintenance library
//!
//! This crate provides the core functionality for:
//! - Loading sensor telemetry datasets with a typed schema
//! - Stratified train/test splitting
//! - Random forest training and feature importance ranking
//! - An impute → scale → classify inference pipeline
//! - Model evaluation (classification report, ROC curve, confusion matrix)
//! - Session context with a trained pipeline cache
//! - Metrics and structured logging

pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod forest;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod ranker;
pub mod session;

pub use error::{LoadError, PipelineError, SchemaError, SessionError, SplitError, TrainError};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use session::{FormPrediction, PipelineKey, Session, SessionConfig};
