//! Standard scaling to zero mean and unit variance

use ndarray::{Array2, ArrayView2, ArrayViewMut1};
use serde::{Deserialize, Serialize};

/// Per-column mean and population standard deviation learned at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    std_devs: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a complete (already imputed) matrix
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let mut means = Vec::with_capacity(x.ncols());
        let mut std_devs = Vec::with_capacity(x.ncols());
        for col in x.columns() {
            let n = col.len().max(1) as f64;
            let mean = col.sum() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            means.push(mean);
            std_devs.push(var.sqrt());
        }
        Self { means, std_devs }
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn std_devs(&self) -> &[f64] {
        &self.std_devs
    }

    pub fn transform_row(&self, mut row: ArrayViewMut1<'_, f64>) {
        for ((v, mean), std) in row.iter_mut().zip(&self.means).zip(&self.std_devs) {
            // Constant columns are centred but not rescaled
            let scale = if *std < f64::EPSILON { 1.0 } else { *std };
            *v = (*v - mean) / scale;
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

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_scaler_statistics() {
        let x = array![
            [2.0, 7.0],
            [4.0, 7.0],
            [4.0, 7.0],
            [4.0, 7.0],
            [5.0, 7.0],
            [5.0, 7.0],
            [7.0, 7.0],
            [9.0, 7.0]
        ];
        let scaler = StandardScaler::fit(x.view());
        assert_eq!(scaler.means(), &[5.0, 7.0]);
        assert!((scaler.std_devs()[0] - 2.0).abs() < 1e-12);
        assert_eq!(scaler.std_devs()[1], 0.0);
    }

    #[test]
    fn test_transform_zero_mean_unit_variance() {
        let x = array![[1.0, 3.0], [2.0, 3.0], [3.0, 3.0]];
        let scaler = StandardScaler::fit(x.view());
        let scaled = scaler.transform(x.view());

        let col = scaled.column(0);
        assert!(col.sum().abs() < 1e-12);
        let var = col.iter().map(|v| v * v).sum::<f64>() / 3.0;
        assert!((var - 1.0).abs() < 1e-12);
        assert!(scaled.column(1).iter().all(|&v| v == 0.0));
    }
}
