use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Behavioral customer segment. The set is closed; training examples with
/// any other label are rejected.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Segment {
    Premium,
    Regular,
    Budget,
    Inactive,
}

impl Segment {
    /// All segments in fixed index order.
    pub const ALL: [Segment; 4] = [
        Segment::Premium,
        Segment::Regular,
        Segment::Budget,
        Segment::Inactive,
    ];

    /// Stable class index used by the classifiers.
    pub fn index(self) -> usize {
        match self {
            Segment::Premium => 0,
            Segment::Regular => 1,
            Segment::Budget => 2,
            Segment::Inactive => 3,
        }
    }

    /// Inverse of [`Segment::index`]. Out-of-range indices map to `Regular`,
    /// the neutral default.
    pub fn from_index(index: usize) -> Segment {
        Segment::ALL.get(index).copied().unwrap_or(Segment::Regular)
    }

    /// Parse a label string, rejecting anything outside the closed set.
    pub fn parse_label(label: &str) -> Result<Segment, AppError> {
        Segment::from_str(label.trim()).map_err(|_| AppError::InvalidLabel(label.to_string()))
    }
}

/// Fixed-order numeric summary of a customer's behavior.
///
/// Field order matters: the classifiers consume these as a positional
/// vector, so training and inference must agree on it (see
/// [`crate::engine::features::FEATURE_NAMES`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFeatures {
    /// Orders per period
    pub order_frequency: f64,

    /// Average order value in currency units
    pub avg_order_value: f64,

    /// Days since the most recent order
    pub days_since_last_order: f64,

    /// Number of distinct services used
    pub service_variety: f64,

    /// Satisfaction score, typically 0-5
    pub satisfaction_score: f64,

    /// Customers referred
    pub referral_count: f64,

    /// Discounts redeemed
    pub discount_usage: f64,

    /// Complaints filed
    pub complaint_count: f64,
}

/// A customer feature vector with its ground-truth segment label.
///
/// The label arrives as a raw string from the boundary and is parsed
/// against the closed segment set during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledCustomer {
    #[serde(flatten)]
    pub features: CustomerFeatures,

    /// Ground-truth segment label
    pub segment: String,
}

/// Classifier output: a segment and the model's certainty in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentPrediction {
    pub segment: Segment,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
}

impl SegmentPrediction {
    pub fn new(segment: Segment, confidence: f64) -> Self {
        Self {
            segment,
            confidence,
        }
    }

    /// Neutral prediction returned when no model has been trained yet.
    pub fn untrained_fallback() -> Self {
        Self::new(Segment::Regular, 0.0)
    }
}
