//! Median imputation

use ndarray::{Array2, ArrayView2, ArrayViewMut1};
use serde::{Deserialize, Serialize};

/// Replaces `NaN` cells with the per-column training median
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    medians: Vec<f64>,
}

impl MedianImputer {
    /// Learn per-column medians, ignoring missing cells.
    ///
    /// A column with no present values imputes `0.0`.
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let medians = x
            .columns()
            .into_iter()
            .map(|col| {
                let mut present: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
                median(&mut present).unwrap_or(0.0)
            })
            .collect();
        Self { medians }
    }

    pub fn medians(&self) -> &[f64] {
        &self.medians
    }

    pub fn transform_row(&self, mut row: ArrayViewMut1<'_, f64>) {
        for (v, m) in row.iter_mut().zip(&self.medians) {
            if v.is_nan() {
                *v = *m;
            }
        }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        for row in out.rows_mut() {
            self.transform_row(row);
        }
        out
    }
}

/// Median of the values (mean of the middle pair for even counts).
/// Reorders the slice; `None` when empty.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_imputer_ignores_missing_when_fitting() {
        let x = array![[1.0, f64::NAN], [f64::NAN, f64::NAN], [5.0, f64::NAN], [3.0, f64::NAN]];
        let imputer = MedianImputer::fit(x.view());
        assert_eq!(imputer.medians(), &[3.0, 0.0]);

        let filled = imputer.transform(x.view());
        assert_eq!(filled[[1, 0]], 3.0);
        assert_eq!(filled[[0, 0]], 1.0);
        assert!(filled.iter().all(|v| !v.is_nan()));
    }
}
