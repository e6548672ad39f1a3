use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        // Customer segmentation
        .route(
            "/v1/segments/:family/train",
            post(handlers::train_segmenter),
        )
        .route(
            "/v1/segments/:family/predict",
            post(handlers::predict_segment),
        )
        // Next-service prediction
        .route("/v1/services/train", post(handlers::train_service_predictor))
        .route("/v1/services/predict", post(handlers::predict_next_service))
        .route(
            "/v1/services/probabilities",
            post(handlers::service_probabilities),
        )
        // Recommendations
        .route("/v1/recommendations/train", post(handlers::train_recommender))
        .route("/v1/recommendations", post(handlers::recommend))
        // Model lifecycle
        .route("/v1/models/status", get(handlers::model_status))
        .route(
            "/v1/models/:family/importance",
            get(handlers::feature_importance),
        )
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(CorsLayer::permissive())
}
