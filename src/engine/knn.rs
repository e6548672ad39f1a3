use crate::config::KnnConfig;
use crate::engine::features::{self, N_ORDER_FEATURES};
use crate::engine::scaling::FeatureScaler;
use crate::error::{AppError, Result};
use crate::models::{OrderRecord, Recommendation};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Nearest-neighbor service recommender.
///
/// A lazy learner: training stores the standardized order vectors with
/// their service types, and recommendation is an inverse-distance
/// weighted vote over the k nearest stored orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnModel {
    scaler: FeatureScaler,
    points: Vec<StoredOrder>,
    k: usize,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub sample_count: usize,

    /// Orders dropped for non-finite amounts or empty items
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredOrder {
    vector: Vec<f64>,
    service: String,
}

impl KnnModel {
    /// Store the training batch: one point per order item, standardized
    /// with a scaler fit on the batch.
    pub fn fit(
        orders: &[OrderRecord],
        now: chrono::DateTime<chrono::Utc>,
        config: &KnnConfig,
    ) -> Result<Self> {
        let mut raw: Vec<([f64; N_ORDER_FEATURES], String)> = Vec::new();
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
                raw.push((vector, service.to_string()));
            }
        }

        if raw.is_empty() {
            return Err(AppError::Validation(
                "training batch has no usable orders".to_string(),
            ));
        }

        let mut matrix = Array2::zeros((raw.len(), N_ORDER_FEATURES));
        for (i, (vector, _)) in raw.iter().enumerate() {
            for (j, &value) in vector.iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }

        let scaler = FeatureScaler::fit(&matrix);
        let points = raw
            .into_iter()
            .map(|(vector, service)| StoredOrder {
                vector: scaler.transform_row(&vector),
                service,
            })
            .collect();

        Ok(Self {
            scaler,
            points,
            k: config.k.max(1),
            trained_at: now,
            sample_count: orders.len() - skipped,
            skipped,
        })
    }

    /// Rank services by weighted vote of the nearest stored orders.
    ///
    /// With fewer than k stored orders the whole set is used and the
    /// reason notes the reduced neighborhood. Empty history returns an
    /// empty list rather than an error.
    pub fn recommend(
        &self,
        history: &[OrderRecord],
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Recommendation>> {
        let Some(query) = features::history_vector(history, now)? else {
            return Ok(Vec::new());
        };

        let query = self.scaler.transform_row(&query);

        let mut neighbors: Vec<(f64, &str)> = self
            .points
            .iter()
            .map(|point| (euclidean(&query, &point.vector), point.service.as_str()))
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        let n_neighbors = self.k.min(neighbors.len());
        let nearest = &neighbors[..n_neighbors];
        let reduced = n_neighbors < self.k;

        // Inverse-distance weighted vote per service.
        let mut votes: Vec<(String, f64, usize)> = Vec::new();
        for &(distance, service) in nearest {
            let weight = 1.0 / (distance + 1e-6);
            match votes.iter_mut().find(|(s, _, _)| s == service) {
                Some((_, total, count)) => {
                    *total += weight;
                    *count += 1;
                }
                None => votes.push((service.to_string(), weight, 1)),
            }
        }

        let total_weight: f64 = votes.iter().map(|(_, weight, _)| weight).sum();

        let mut recommendations: Vec<Recommendation> = votes
            .into_iter()
            .map(|(service, weight, count)| {
                let reason = if reduced {
                    format!(
                        "ordered in {count} of the {n_neighbors} available similar orders \
                         (fewer than {} on record, confidence reduced)",
                        self.k
                    )
                } else {
                    format!("frequently ordered by similar customers ({count} of {n_neighbors} nearest orders)")
                };

                Recommendation {
                    service,
                    confidence: weight / total_weight,
                    reason,
                }
            })
            .collect();

        // Rank descending; equal weights fall back to name order so the
        // output is deterministic.
        recommendations.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.service.cmp(&b.service))
        });

        Ok(recommendations)
    }

    pub fn stored_points(&self) -> usize {
        self.points.len()
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
