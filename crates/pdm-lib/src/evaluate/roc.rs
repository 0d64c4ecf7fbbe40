//! ROC curve and area under it

use crate::models::Label;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Scores at or above this value are classified as failure.
    /// The first point uses `+inf` (serialized as `null`).
    #[serde(deserialize_with = "threshold_or_infinity")]
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

/// JSON has no infinity; `null` reads back as `+inf`
fn threshold_or_infinity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    /// Trapezoidal area; `None` when the labels contain a single class
    pub auc: Option<f64>,
}

impl RocCurve {
    /// Sweep thresholds over every distinct score, highest first
    pub fn from_scores(scores: &[f64], labels: &[Label]) -> Self {
        let mut pairs: Vec<(f64, bool)> = scores
            .iter()
            .zip(labels)
            .map(|(&s, l)| (s, l.is_failure()))
            .collect();
        pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let positives = pairs.iter().filter(|p| p.1).count() as f64;
        let negatives = pairs.len() as f64 - positives;
        let rate = |count: f64, total: f64| if total > 0.0 { count / total } else { 0.0 };

        let mut points = vec![RocPoint {
            threshold: f64::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
        }];
        let (mut tp, mut fp) = (0.0, 0.0);
        for (i, &(score, positive)) in pairs.iter().enumerate() {
            if positive {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            let boundary = pairs.get(i + 1).map_or(true, |next| next.0 != score);
            if boundary {
                points.push(RocPoint {
                    threshold: score,
                    fpr: rate(fp, negatives),
                    tpr: rate(tp, positives),
                });
            }
        }

        let auc = if positives > 0.0 && negatives > 0.0 {
            Some(trapezoid_area(&points))
        } else {
            None
        };
        Self { points, auc }
    }
}

fn trapezoid_area(points: &[RocPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Failure as F, NoFailure as N};

    #[test]
    fn test_perfect_separation() {
        let roc = RocCurve::from_scores(&[0.9, 0.8, 0.2, 0.1], &[F, F, N, N]);
        assert_eq!(roc.auc, Some(1.0));
        let last = roc.points.last().unwrap();
        assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
    }

    #[test]
    fn test_known_auc() {
        // sklearn's roc_auc_score for this input is 0.75
        let roc = RocCurve::from_scores(&[0.1, 0.4, 0.35, 0.8], &[N, N, F, F]);
        assert!((roc.auc.unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(roc.points.len(), 5);
        assert!(roc.points[0].threshold.is_infinite());
    }

    #[test]
    fn test_tied_scores_collapse_to_one_point() {
        let roc = RocCurve::from_scores(&[0.5, 0.5, 0.5, 0.5], &[F, N, F, N]);
        assert_eq!(roc.points.len(), 2);
        assert_eq!(roc.auc, Some(0.5));
    }

    #[test]
    fn test_single_class_has_no_auc() {
        let roc = RocCurve::from_scores(&[0.2, 0.3], &[N, N]);
        assert_eq!(roc.auc, None);
        assert!(roc.points.iter().all(|p| p.tpr == 0.0));
    }

    #[test]
    fn test_curve_is_monotone() {
        let scores = [0.3, 0.7, 0.7, 0.1, 0.9, 0.5, 0.2];
        let labels = [N, F, N, N, F, F, N];
        let roc = RocCurve::from_scores(&scores, &labels);
        assert!(roc
            .points
            .windows(2)
            .all(|w| w[1].fpr >= w[0].fpr && w[1].tpr >= w[0].tpr));
    }

    #[test]
    fn test_infinite_threshold_round_trips_through_null() {
        let roc = RocCurve::from_scores(&[0.7, 0.2], &[F, N]);
        let json = serde_json::to_value(&roc).unwrap();
        assert!(json["points"][0]["threshold"].is_null());
        assert_eq!(json["points"][1]["threshold"], 0.7);
        assert_eq!(json["auc"], 1.0);

        let back: RocCurve = serde_json::from_value(json).unwrap();
        assert_eq!(back, roc);
        assert!(back.points[0].threshold.is_infinite());
    }
}
