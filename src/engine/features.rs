use crate::error::{AppError, Result};
use crate::models::{CustomerFeatures, LabeledCustomer, OrderRecord, Segment};
use ndarray::Array2;

/// Number of customer behavior features consumed by the segmenters.
pub const N_FEATURES: usize = 8;

/// Fixed feature order shared by training and inference. The classifiers
/// are order-sensitive, so this is the single source of truth.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "orderFrequency",
    "avgOrderValue",
    "daysSinceLastOrder",
    "serviceVariety",
    "satisfactionScore",
    "referralCount",
    "discountUsage",
    "complaintCount",
];

/// Number of derived order-history features used by Naive Bayes and KNN.
pub const N_ORDER_FEATURES: usize = 3;

/// Fixed order of the derived order-history features.
pub const ORDER_FEATURE_NAMES: [&str; N_ORDER_FEATURES] =
    ["userOrderCount", "totalAmount", "recencyDays"];

/// Flatten a customer record into its fixed-order feature vector.
pub fn vector_from(customer: &CustomerFeatures) -> [f64; N_FEATURES] {
    [
        customer.order_frequency,
        customer.avg_order_value,
        customer.days_since_last_order,
        customer.service_variety,
        customer.satisfaction_score,
        customer.referral_count,
        customer.discount_usage,
        customer.complaint_count,
    ]
}

/// Validate a customer record for inference. Every attribute must be a
/// finite number; anything else is rejected rather than defaulted.
pub fn validate(customer: &CustomerFeatures) -> Result<()> {
    for (value, name) in vector_from(customer).iter().zip(FEATURE_NAMES.iter()) {
        if !value.is_finite() {
            return Err(AppError::MissingField((*name).to_string()));
        }
    }
    Ok(())
}

/// Derive the numeric vector for a single historical order: cumulative
/// order count, order amount, and recency in days relative to `now`
/// (clamped at zero for clock skew).
pub fn order_vector(
    order: &OrderRecord,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<[f64; N_ORDER_FEATURES]> {
    if !order.total_amount.is_finite() {
        return Err(AppError::MissingField("totalAmount".to_string()));
    }

    let recency_days = (now - order.created_at).num_days().max(0) as f64;

    Ok([
        f64::from(order.user_order_count),
        order.total_amount,
        recency_days,
    ])
}

/// Collapse a user's order history into a single query vector: mean order
/// count, mean spend, and the recency of the most recent order. Returns
/// `None` for empty history, which callers turn into the documented
/// empty/prior fallback rather than an error.
pub fn history_vector(
    history: &[OrderRecord],
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Option<[f64; N_ORDER_FEATURES]>> {
    if history.is_empty() {
        return Ok(None);
    }

    let mut count_sum = 0.0;
    let mut amount_sum = 0.0;
    let mut min_recency = f64::MAX;

    for order in history {
        let vector = order_vector(order, now)?;
        count_sum += vector[0];
        amount_sum += vector[1];
        min_recency = min_recency.min(vector[2]);
    }

    let n = history.len() as f64;
    Ok(Some([count_sum / n, amount_sum / n, min_recency]))
}

/// The outcome of preparing a labeled training batch.
#[derive(Debug)]
pub struct LabeledMatrix {
    /// Feature matrix (n_samples x N_FEATURES)
    pub features: Array2<f64>,

    /// Segment class index per row
    pub labels: Vec<usize>,

    /// Examples dropped for non-finite attributes
    pub skipped: usize,
}

/// Build the training matrix from labeled customers.
///
/// Incomplete examples (non-finite attributes) are skipped with a count
/// rather than failing the batch; unknown segment labels fail the whole
/// batch since they indicate corrupt ground truth.
pub fn labeled_matrix(customers: &[LabeledCustomer]) -> Result<LabeledMatrix> {
    let mut rows: Vec<[f64; N_FEATURES]> = Vec::with_capacity(customers.len());
    let mut labels = Vec::with_capacity(customers.len());
    let mut skipped = 0;

    for customer in customers {
        let segment = Segment::parse_label(&customer.segment)?;
        let vector = vector_from(&customer.features);

        if vector.iter().any(|v| !v.is_finite()) {
            skipped += 1;
            continue;
        }

        rows.push(vector);
        labels.push(segment.index());
    }

    if rows.is_empty() {
        return Err(AppError::Validation(
            "training batch has no usable examples".to_string(),
        ));
    }

    let mut features = Array2::zeros((rows.len(), N_FEATURES));
    for (i, row) in rows.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            features[[i, j]] = value;
        }
    }

    Ok(LabeledMatrix {
        features,
        labels,
        skipped,
    })
}
