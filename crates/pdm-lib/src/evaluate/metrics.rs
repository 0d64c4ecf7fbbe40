//! Classification metrics: confusion matrix and per-class report

use crate::models::Label;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts of actual × predicted labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// `counts[actual][predicted]`, indexed by [`Label::index`]
    counts: [[u64; 2]; 2],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self { counts: [[0; 2]; 2] }
    }

    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        let mut cm = Self::new();
        for (&a, &p) in actual.iter().zip(predicted) {
            cm.add(a, p);
        }
        cm
    }

    pub fn add(&mut self, actual: Label, predicted: Label) {
        self.counts[actual.index()][predicted.index()] += 1;
    }

    pub fn get(&self, actual: Label, predicted: Label) -> u64 {
        self.counts[actual.index()][predicted.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn true_positives(&self) -> u64 {
        self.get(Label::Failure, Label::Failure)
    }

    pub fn false_positives(&self) -> u64 {
        self.get(Label::NoFailure, Label::Failure)
    }

    pub fn false_negatives(&self) -> u64 {
        self.get(Label::Failure, Label::NoFailure)
    }

    pub fn true_negatives(&self) -> u64 {
        self.get(Label::NoFailure, Label::NoFailure)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives() + self.true_negatives(), self.total())
    }

    /// Metrics for one class treated as the positive class
    pub fn class_metrics(&self, class: Label) -> ClassMetrics {
        let tp = self.get(class, class);
        let predicted: u64 = Label::ALL.iter().map(|&a| self.get(a, class)).sum();
        let support: u64 = Label::ALL.iter().map(|&p| self.get(class, p)).sum();
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassMetrics {
            label: class,
            precision,
            recall,
            f1,
            support,
        }
    }
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Precision/recall/F1 averaged over classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Per-class metrics with accuracy, macro and support-weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = Label::ALL.iter().map(|&l| cm.class_metrics(l)).collect();
        let support = cm.total();
        let k = classes.len() as f64;

        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / k,
            support,
        };

        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            if support == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|c| metric(c) * c.support as f64)
                    .sum::<f64>()
                    / support as f64
            }
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support,
        };

        Self {
            accuracy: cm.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn class(&self, label: Label) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.label.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Failure as F, NoFailure as N};

    fn sample_matrix() -> ConfusionMatrix {
        // 6 TN, 2 FP, 1 FN, 3 TP
        let actual = [N, N, N, N, N, N, N, N, F, F, F, F];
        let predicted = [N, N, N, N, N, N, F, F, N, F, F, F];
        ConfusionMatrix::from_labels(&actual, &predicted)
    }

    #[test]
    fn test_confusion_counts() {
        let cm = sample_matrix();
        assert_eq!(cm.true_negatives(), 6);
        assert_eq!(cm.false_positives(), 2);
        assert_eq!(cm.false_negatives(), 1);
        assert_eq!(cm.true_positives(), 3);
        assert_eq!(cm.total(), 12);
        assert!((cm.accuracy() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_class_metrics() {
        let cm = sample_matrix();
        let failure = cm.class_metrics(F);
        assert!((failure.precision - 0.6).abs() < 1e-12);
        assert!((failure.recall - 0.75).abs() < 1e-12);
        assert!((failure.f1 - 2.0 * 0.6 * 0.75 / 1.35).abs() < 1e-12);
        assert_eq!(failure.support, 4);

        let healthy = cm.class_metrics(N);
        assert!((healthy.precision - 6.0 / 7.0).abs() < 1e-12);
        assert_eq!(healthy.support, 8);
    }

    #[test]
    fn test_report_averages() {
        let report = ClassificationReport::from_confusion(&sample_matrix());
        let n = report.class(N).unwrap();
        let f = report.class(F).unwrap();
        assert!((report.macro_avg.recall - (n.recall + f.recall) / 2.0).abs() < 1e-12);
        let weighted = (n.f1 * 8.0 + f.f1 * 4.0) / 12.0;
        assert!((report.weighted_avg.f1 - weighted).abs() < 1e-12);

        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("Failure"));
    }

    #[test]
    fn test_zero_division_yields_zero() {
        let cm = ConfusionMatrix::from_labels(&[N, N], &[N, N]);
        let failure = cm.class_metrics(F);
        assert_eq!(failure.precision, 0.0);
        assert_eq!(failure.recall, 0.0);
        assert_eq!(failure.f1, 0.0);
    }
}
