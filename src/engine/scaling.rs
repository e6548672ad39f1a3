use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-feature standardization (zero mean, unit variance) fit on a
/// training batch and stored inside the model so the exact same
/// transform is reapplied at inference. The customer features vary
/// wildly in scale (days vs. scores vs. counts), so the margin-based
/// models are unusable without this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl FeatureScaler {
    /// Fit mean and standard deviation per column.
    pub fn fit(x: &Array2<f64>) -> Self {
        let (n_samples, n_features) = x.dim();
        let n = n_samples as f64;

        let mut mean = vec![0.0; n_features];
        let mut std = vec![0.0; n_features];

        for j in 0..n_features {
            let mut sum = 0.0;
            for i in 0..n_samples {
                sum += x[[i, j]];
            }
            mean[j] = sum / n;

            let mut sum_sq = 0.0;
            for i in 0..n_samples {
                let diff = x[[i, j]] - mean[j];
                sum_sq += diff * diff;
            }
            let variance = sum_sq / n;
            // Constant columns scale by 1 so they pass through centered.
            std[j] = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        }

        Self { mean, std }
    }

    /// Standardize a single row.
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(&v, (&m, &s))| (v - m) / s)
            .collect()
    }

    /// Standardize a full matrix.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let (n_samples, n_features) = x.dim();
        let mut out = Array2::zeros((n_samples, n_features));

        for i in 0..n_samples {
            for j in 0..n_features {
                out[[i, j]] = (x[[i, j]] - self.mean[j]) / self.std[j];
            }
        }

        out
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}
