use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// A line item within a historical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Service name, e.g. "wash_and_fold" or "dry_cleaning"
    pub service_type: String,
}

/// A historical order record, the raw input to the Naive Bayes predictor
/// and the KNN recommender. Consumed via derived numeric vectors rather
/// than raw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// The user's cumulative order count at the time of this order
    pub user_order_count: u32,

    /// Total order amount in currency units
    pub total_amount: f64,

    /// Order creation timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Services in the order
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// A ranked service suggestion from the recommender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Recommended service type
    pub service: String,

    /// Confidence score (0.0 - 1.0), proportional to neighbor vote weight
    pub confidence: f64,

    /// Short human-readable justification
    pub reason: String,
}

/// Model family tag used to select a classifier through the registry.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelFamily {
    Tree,
    Svm,
    Bayes,
    Knn,
}

impl ModelFamily {
    /// Parse a family tag from a route parameter.
    pub fn parse(tag: &str) -> Result<ModelFamily, AppError> {
        ModelFamily::from_str(tag.trim())
            .map_err(|_| AppError::Validation(format!("unknown model family: {tag}")))
    }
}

/// The two families that segment customers from feature vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterFamily {
    Tree,
    Svm,
}

impl SegmenterFamily {
    pub fn parse(tag: &str) -> Result<SegmenterFamily, AppError> {
        match ModelFamily::parse(tag)? {
            ModelFamily::Tree => Ok(SegmenterFamily::Tree),
            ModelFamily::Svm => Ok(SegmenterFamily::Svm),
            other => Err(AppError::Validation(format!(
                "family {other} does not segment customers"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parsing() {
        assert_eq!(ModelFamily::parse("tree").unwrap(), ModelFamily::Tree);
        assert_eq!(ModelFamily::parse("svm").unwrap(), ModelFamily::Svm);
        assert_eq!(ModelFamily::parse("bayes").unwrap(), ModelFamily::Bayes);
        assert_eq!(ModelFamily::parse("knn").unwrap(), ModelFamily::Knn);
        assert!(ModelFamily::parse("forest").is_err());
    }

    #[test]
    fn test_segmenter_family_subset() {
        assert_eq!(SegmenterFamily::parse("tree").unwrap(), SegmenterFamily::Tree);
        assert_eq!(SegmenterFamily::parse("svm").unwrap(), SegmenterFamily::Svm);
        assert!(SegmenterFamily::parse("bayes").is_err());
        assert!(SegmenterFamily::parse("knn").is_err());
    }

    #[test]
    fn test_order_record_deserializes_camel_case() {
        let json = serde_json::json!({
            "userOrderCount": 7,
            "totalAmount": 1450.0,
            "createdAt": "2026-08-01T09:30:00Z",
            "items": [{"serviceType": "dry_cleaning"}]
        });

        let order: OrderRecord = serde_json::from_value(json).unwrap();
        assert_eq!(order.user_order_count, 7);
        assert_eq!(order.items[0].service_type, "dry_cleaning");
    }
}
