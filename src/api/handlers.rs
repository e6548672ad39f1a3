use crate::api::AppState;
use crate::engine::{ModelStatusReport, TrainReport};
use crate::error::Result;
use crate::models::{
    CustomerFeatures, LabeledCustomer, ModelFamily, OrderRecord, Recommendation,
    SegmentPrediction, SegmenterFamily,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Train a segmentation model family
pub async fn train_segmenter(
    State(state): State<AppState>,
    Path(family): Path<String>,
    Json(request): Json<TrainSegmenterRequest>,
) -> Result<Json<TrainResponse>> {
    request.validate()?;
    let family = SegmenterFamily::parse(&family)?;

    let report = state
        .engine
        .train_segmenter(family, &request.customers)
        .await?;

    Ok(Json(TrainResponse::from(report)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrainSegmenterRequest {
    #[validate(length(min = 1))]
    pub customers: Vec<LabeledCustomer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainResponse {
    pub message: String,
    pub sample_count: usize,
    pub skipped: usize,
}

impl From<TrainReport> for TrainResponse {
    fn from(report: TrainReport) -> Self {
        Self {
            message: report.message,
            sample_count: report.sample_count,
            skipped: report.skipped,
        }
    }
}

/// Predict a customer's segment with the requested family
pub async fn predict_segment(
    State(state): State<AppState>,
    Path(family): Path<String>,
    Json(request): Json<PredictSegmentRequest>,
) -> Result<Json<SegmentResponse>> {
    let family = SegmenterFamily::parse(&family)?;

    let prediction = state
        .engine
        .predict_segment(family, &request.customer_data)
        .await?;

    Ok(Json(SegmentResponse {
        segment: prediction,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictSegmentRequest {
    pub customer_data: CustomerFeatures,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentResponse {
    pub segment: SegmentPrediction,
}

/// Train the next-service predictor
pub async fn train_service_predictor(
    State(state): State<AppState>,
    Json(request): Json<TrainOrdersRequest>,
) -> Result<Json<TrainResponse>> {
    request.validate()?;
    let report = state.engine.train_bayes(&request.orders).await?;
    Ok(Json(TrainResponse::from(report)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrainOrdersRequest {
    #[validate(length(min = 1))]
    pub orders: Vec<OrderRecord>,
}

/// Predict the most probable next service for a user
pub async fn predict_next_service(
    State(state): State<AppState>,
    Json(request): Json<HistoryRequest>,
) -> Result<Json<NextServiceResponse>> {
    let predicted = state
        .engine
        .predict_next_service(&request.user_order_history)
        .await?;

    Ok(Json(NextServiceResponse {
        prediction: predicted,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    #[serde(default)]
    pub user_order_history: Vec<OrderRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextServiceResponse {
    pub prediction: Option<String>,
}

/// Full posterior over known services for a user
pub async fn service_probabilities(
    State(state): State<AppState>,
    Json(request): Json<HistoryRequest>,
) -> Result<Json<ProbabilitiesResponse>> {
    let probabilities = state
        .engine
        .service_probabilities(&request.user_order_history)
        .await?;

    Ok(Json(ProbabilitiesResponse { probabilities }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilitiesResponse {
    pub probabilities: BTreeMap<String, f64>,
}

/// Train the KNN recommender
pub async fn train_recommender(
    State(state): State<AppState>,
    Json(request): Json<TrainOrdersRequest>,
) -> Result<Json<TrainResponse>> {
    request.validate()?;
    let report = state.engine.train_recommender(&request.orders).await?;
    Ok(Json(TrainResponse::from(report)))
}

/// Ranked service recommendations for a user
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<HistoryRequest>,
) -> Result<Json<RecommendationsResponse>> {
    let recommendations = state
        .engine
        .recommend(&request.user_order_history)
        .await?;

    Ok(Json(RecommendationsResponse { recommendations }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
}

/// Lifecycle status for all model families
pub async fn model_status(State(state): State<AppState>) -> Result<Json<ModelStatusReport>> {
    Ok(Json(state.engine.status().await))
}

/// Feature importance for a model family
pub async fn feature_importance(
    State(state): State<AppState>,
    Path(family): Path<String>,
) -> Result<Json<ImportanceResponse>> {
    let family = ModelFamily::parse(&family)?;
    let importance = state.engine.feature_importance(family).await?;

    Ok(Json(ImportanceResponse {
        family: family.to_string(),
        importance: importance
            .into_iter()
            .map(|(name, weight)| (name.to_string(), weight))
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportanceResponse {
    pub family: String,
    pub importance: BTreeMap<String, f64>,
}
