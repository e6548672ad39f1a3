use crate::config::SvmConfig;
use crate::engine::features::{FEATURE_NAMES, N_FEATURES};
use crate::engine::scaling::FeatureScaler;
use crate::error::{AppError, Result};
use crate::models::{Segment, SegmentPrediction};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const N_CLASSES: usize = Segment::ALL.len();

/// One linear max-margin machine of the one-vs-rest ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryMachine {
    weights: Vec<f64>,
    bias: f64,
}

impl BinaryMachine {
    /// Hinge-loss subgradient descent with learning-rate decay.
    ///
    /// Minimizes lambda * ||w||^2 + (1/n) * sum(max(0, 1 - y_i (w.x_i + b)))
    /// with lambda = 1 / (2 n C). Deterministic: weights start at zero
    /// and samples are visited in order.
    fn fit(x: &Array2<f64>, y_signed: &[f64], config: &SvmConfig) -> Self {
        let (n_samples, n_features) = x.dim();
        let mut w = vec![0.0; n_features];
        let mut b = 0.0;

        let lambda = 1.0 / (2.0 * n_samples as f64 * config.c);

        for epoch in 0..config.epochs {
            let eta = config.learning_rate / (1.0 + epoch as f64 * 0.01);

            for (i, &y_i) in y_signed.iter().enumerate() {
                let mut decision = b;
                for (j, &w_j) in w.iter().enumerate() {
                    decision += w_j * x[[i, j]];
                }

                if y_i * decision < 1.0 {
                    // Within margin or misclassified: hinge gradient
                    for (j, w_j) in w.iter_mut().enumerate() {
                        *w_j -= eta * (2.0 * lambda * *w_j - y_i * x[[i, j]]);
                    }
                    b += eta * y_i;
                } else {
                    // Outside margin: regularization only
                    for w_j in &mut w {
                        *w_j -= eta * 2.0 * lambda * *w_j;
                    }
                }
            }
        }

        Self { weights: w, bias: b }
    }

    fn decision(&self, vector: &[f64]) -> f64 {
        let mut decision = self.bias;
        for (j, &w_j) in self.weights.iter().enumerate() {
            decision += w_j * vector[j];
        }
        decision
    }
}

/// One-vs-rest linear support-vector segmenter.
///
/// Features are standardized with a scaler fit on the training batch and
/// stored in the model; the same transform is reapplied at inference.
/// Confidence is a logistic transform of the margin between the best and
/// second-best per-class decision values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmModel {
    machines: Vec<BinaryMachine>,
    scaler: FeatureScaler,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub sample_count: usize,
}

impl SvmModel {
    /// Train one binary machine per segment against the rest.
    ///
    /// Segments absent from the batch still get a machine (trained on
    /// all-negative labels), so prediction stays closed over the four
    /// segments; a single-label batch degenerates to a constant
    /// predictor.
    pub fn fit(x: &Array2<f64>, y: &[usize], config: &SvmConfig) -> Result<Self> {
        let n_samples = y.len();
        if n_samples == 0 || x.nrows() != n_samples {
            return Err(AppError::Internal(
                "training matrix and labels disagree".to_string(),
            ));
        }

        let scaler = FeatureScaler::fit(x);
        let scaled = scaler.transform(x);

        let machines = (0..N_CLASSES)
            .map(|class| {
                let y_signed: Vec<f64> = y
                    .iter()
                    .map(|&label| if label == class { 1.0 } else { -1.0 })
                    .collect();
                BinaryMachine::fit(&scaled, &y_signed, config)
            })
            .collect();

        Ok(Self {
            machines,
            scaler,
            trained_at: chrono::Utc::now(),
            sample_count: n_samples,
        })
    }

    /// Predict the segment with the largest decision value.
    pub fn predict(&self, vector: &[f64; N_FEATURES]) -> SegmentPrediction {
        let scaled = self.scaler.transform_row(vector);

        let decisions: Vec<f64> = self
            .machines
            .iter()
            .map(|machine| machine.decision(&scaled))
            .collect();

        let best = decisions
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(class, _)| class)
            .unwrap_or(Segment::Regular.index());

        let best_decision = decisions[best];
        let runner_up = decisions
            .iter()
            .enumerate()
            .filter(|(class, _)| *class != best)
            .map(|(_, &d)| d)
            .fold(f64::NEG_INFINITY, f64::max);

        // Logistic transform of the winning margin: 0.5 for an exact
        // tie, approaching 1.0 as the winner pulls away.
        let confidence = sigmoid(best_decision - runner_up);

        SegmentPrediction::new(Segment::from_index(best), confidence)
    }

    /// Mean absolute standardized weight per feature across the
    /// one-vs-rest machines, normalized to sum to 1.
    pub fn feature_importance(&self) -> BTreeMap<&'static str, f64> {
        let mut magnitude = vec![0.0; N_FEATURES];
        for machine in &self.machines {
            for (j, &w_j) in machine.weights.iter().enumerate() {
                magnitude[j] += w_j.abs();
            }
        }

        let total: f64 = magnitude.iter().sum();
        if total > 0.0 {
            for value in &mut magnitude {
                *value /= total;
            }
        }

        FEATURE_NAMES
            .iter()
            .zip(magnitude.iter())
            .map(|(&name, &weight)| (name, weight))
            .collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
