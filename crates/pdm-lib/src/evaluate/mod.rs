//! Held-out evaluation
//!
//! Scores a fitted classifier on the test rows and summarizes the result
//! as a classification report, an ROC curve with its AUC, and a
//! confusion matrix.

mod metrics;
mod roc;

pub use metrics::{AverageMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use roc::{RocCurve, RocPoint};

use crate::error::SchemaError;
use crate::forest::Classifier;
use crate::models::{Label, Prediction};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
    pub roc: RocCurve,
    pub n_test: usize,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> f64 {
        self.report.accuracy
    }

    pub fn auc(&self) -> Option<f64> {
        self.roc.auc
    }
}

/// Evaluate `model` on held-out rows in training column order
pub fn evaluate<C: Classifier + ?Sized>(
    model: &C,
    x: ArrayView2<'_, f64>,
    y: &[Label],
) -> Result<EvaluationReport, SchemaError> {
    if x.ncols() != model.n_features() {
        return Err(SchemaError::WidthMismatch {
            expected: model.n_features(),
            actual: x.ncols(),
        });
    }

    let scores: Vec<f64> = x
        .rows()
        .into_iter()
        .map(|row| model.failure_probability(row))
        .collect();
    let predicted: Vec<Label> = scores
        .iter()
        .map(|&p| Prediction::from_probability(p).label)
        .collect();

    let confusion = ConfusionMatrix::from_labels(y, &predicted);
    let report = ClassificationReport::from_confusion(&confusion);
    let roc = RocCurve::from_scores(&scores, y);

    info!(
        test_rows = y.len(),
        accuracy = report.accuracy,
        auc = ?roc.auc,
        "Evaluated classifier"
    );

    Ok(EvaluationReport {
        report,
        confusion,
        roc,
        n_test: y.len(),
    })
}
