//! Inference pipeline: median imputation → standard scaling → random forest
//!
//! Every statistic is learned from the training rows at fit time and frozen,
//! so training, evaluation and single-record prediction all see the same
//! preprocessing.

mod imputer;
mod inference;
mod input;
mod scaler;

pub use imputer::{median, MedianImputer};
pub use inference::{InferencePipeline, TrainedPipeline};
pub use input::{parse_form, ParsedInput, Substitution};
pub use scaler::StandardScaler;
