use crate::config::BayesConfig;
use crate::engine::features::{self, N_ORDER_FEATURES};
use crate::error::{AppError, Result};
use crate::models::OrderRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Naive Bayes next-service predictor over discretized order features.
///
/// Service classes are learned from the training batch (each order item
/// contributes one example labeled by its service type). The three
/// numeric order features are bucketed into equal-width bins whose edges
/// are fit from the batch and stored with the model; add-one smoothing
/// keeps unseen bins from collapsing the posterior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesModel {
    /// Sorted service classes (sorted for deterministic argmax ties)
    classes: Vec<String>,

    /// log P(class)
    log_priors: Vec<f64>,

    /// log P(bin | class), indexed [class][feature][bin]
    log_likelihoods: Vec<Vec<Vec<f64>>>,

    /// Per-feature (min, max) fit from training; values outside clamp to
    /// the nearest edge bin
    ranges: [(f64, f64); N_ORDER_FEATURES],

    bins: usize,

    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub sample_count: usize,

    /// Orders dropped for non-finite amounts or empty items
    pub skipped: usize,
}

impl BayesModel {
    /// Fit priors, bin edges, and smoothed likelihoods from an order batch.
    pub fn fit(
        orders: &[OrderRecord],
        now: chrono::DateTime<chrono::Utc>,
        config: &BayesConfig,
    ) -> Result<Self> {
        let bins = config.bins.max(1);

        let mut examples: Vec<([f64; N_ORDER_FEATURES], String)> = Vec::new();
        let mut skipped = 0;

        for order in orders {
            let Ok(vector) = features::order_vector(order, now) else {
                skipped += 1;
                continue;
            };

            let services: Vec<&str> = order
                .items
                .iter()
                .map(|item| item.service_type.trim())
                .filter(|s| !s.is_empty())
                .collect();

            if services.is_empty() {
                skipped += 1;
                continue;
            }

            for service in services {
                examples.push((vector, service.to_string()));
            }
        }

        if examples.is_empty() {
            return Err(AppError::Validation(
                "training batch has no usable orders".to_string(),
            ));
        }

        let mut classes: Vec<String> = examples.iter().map(|(_, c)| c.clone()).collect();
        classes.sort();
        classes.dedup();

        // Equal-width bin edges from the observed feature ranges.
        let mut ranges = [(f64::MAX, f64::MIN); N_ORDER_FEATURES];
        for (vector, _) in &examples {
            for (j, &value) in vector.iter().enumerate() {
                ranges[j].0 = ranges[j].0.min(value);
                ranges[j].1 = ranges[j].1.max(value);
            }
        }

        let n_classes = classes.len();
        let mut class_totals = vec![0usize; n_classes];
        let mut counts = vec![vec![vec![0usize; bins]; N_ORDER_FEATURES]; n_classes];

        for (vector, service) in &examples {
            let class = classes
                .binary_search(service)
                .map_err(|_| AppError::Internal("class index out of sync".to_string()))?;
            class_totals[class] += 1;
            for (j, &value) in vector.iter().enumerate() {
                counts[class][j][bin_index(value, ranges[j], bins)] += 1;
            }
        }

        let total = examples.len() as f64;
        let log_priors: Vec<f64> = class_totals
            .iter()
            .map(|&count| (count as f64 / total).ln())
            .collect();

        // Laplace smoothing: (count + 1) / (class_total + bins)
        let log_likelihoods: Vec<Vec<Vec<f64>>> = counts
            .iter()
            .zip(class_totals.iter())
            .map(|(feature_counts, &class_total)| {
                feature_counts
                    .iter()
                    .map(|bin_counts| {
                        bin_counts
                            .iter()
                            .map(|&count| {
                                ((count + 1) as f64 / (class_total + bins) as f64).ln()
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            classes,
            log_priors,
            log_likelihoods,
            ranges,
            bins,
            trained_at: now,
            sample_count: examples.len(),
            skipped,
        })
    }

    /// Full posterior over service classes for a user's order history.
    ///
    /// Empty history yields the prior distribution rather than an error.
    pub fn predict_proba(
        &self,
        history: &[OrderRecord],
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<BTreeMap<String, f64>> {
        let query = features::history_vector(history, now)?;

        let mut log_posterior = self.log_priors.clone();

        if let Some(vector) = query {
            for (class, posterior) in log_posterior.iter_mut().enumerate() {
                for (j, &value) in vector.iter().enumerate() {
                    let bin = bin_index(value, self.ranges[j], self.bins);
                    *posterior += self.log_likelihoods[class][j][bin];
                }
            }
        }

        // Log-sum-exp normalization
        let max = log_posterior
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = log_posterior.iter().map(|&lp| (lp - max).exp()).collect();
        let sum: f64 = exp.iter().sum();

        Ok(self
            .classes
            .iter()
            .zip(exp.iter())
            .map(|(class, &e)| (class.clone(), e / sum))
            .collect())
    }

    /// Most probable next service. Ties resolve to the first class in
    /// sorted order, keeping prediction deterministic.
    pub fn predict(
        &self,
        history: &[OrderRecord],
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<String> {
        let probabilities = self.predict_proba(history, now)?;

        probabilities
            .into_iter()
            .max_by(|(class_a, p_a), (class_b, p_b)| {
                p_a.total_cmp(p_b)
                    .then_with(|| class_b.cmp(class_a))
            })
            .map(|(class, _)| class)
            .ok_or_else(|| AppError::Internal("model has no classes".to_string()))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Map a value into its equal-width bin, clamping out-of-range values to
/// the nearest edge bin.
fn bin_index(value: f64, (min, max): (f64, f64), bins: usize) -> usize {
    let width = (max - min) / bins as f64;
    if width <= 0.0 {
        return 0;
    }
    let raw = ((value - min) / width).floor();
    (raw.max(0.0) as usize).min(bins - 1)
}
