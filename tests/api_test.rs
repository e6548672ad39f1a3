/// HTTP API tests
///
/// Drive the axum router directly with `tower::ServiceExt::oneshot`,
/// asserting on status codes and response shapes the way a client
/// would observe them.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use customer_intel::{
    api::{build_router, AppState},
    config::EngineConfig,
    engine::EngineService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let engine = Arc::new(EngineService::new(EngineConfig::default()));
    build_router(AppState::new(engine))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(payload) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        // Built-in extractor rejections respond with plain text, not JSON.
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

fn training_customers() -> Value {
    json!({
        "customers": [
            {"orderFrequency": 22.0, "avgOrderValue": 3200.0, "daysSinceLastOrder": 3.0,
             "serviceVariety": 4.0, "satisfactionScore": 4.9, "referralCount": 3.0,
             "discountUsage": 1.0, "complaintCount": 0.0, "segment": "premium"},
            {"orderFrequency": 18.0, "avgOrderValue": 2800.0, "daysSinceLastOrder": 5.0,
             "serviceVariety": 4.0, "satisfactionScore": 4.6, "referralCount": 2.0,
             "discountUsage": 1.0, "complaintCount": 0.0, "segment": "premium"},
            {"orderFrequency": 8.0, "avgOrderValue": 1000.0, "daysSinceLastOrder": 15.0,
             "serviceVariety": 3.0, "satisfactionScore": 3.8, "referralCount": 1.0,
             "discountUsage": 2.0, "complaintCount": 0.0, "segment": "regular"},
            {"orderFrequency": 6.0, "avgOrderValue": 800.0, "daysSinceLastOrder": 20.0,
             "serviceVariety": 2.0, "satisfactionScore": 3.5, "referralCount": 0.0,
             "discountUsage": 3.0, "complaintCount": 1.0, "segment": "regular"},
            {"orderFrequency": 3.0, "avgOrderValue": 300.0, "daysSinceLastOrder": 35.0,
             "serviceVariety": 1.0, "satisfactionScore": 2.9, "referralCount": 0.0,
             "discountUsage": 5.0, "complaintCount": 1.0, "segment": "budget"},
            {"orderFrequency": 1.0, "avgOrderValue": 180.0, "daysSinceLastOrder": 150.0,
             "serviceVariety": 1.0, "satisfactionScore": 2.0, "referralCount": 0.0,
             "discountUsage": 1.0, "complaintCount": 2.0, "segment": "inactive"},
            {"orderFrequency": 0.0, "avgOrderValue": 120.0, "daysSinceLastOrder": 240.0,
             "serviceVariety": 1.0, "satisfactionScore": 1.5, "referralCount": 0.0,
             "discountUsage": 0.0, "complaintCount": 3.0, "segment": "inactive"}
        ]
    })
}

fn premium_probe() -> Value {
    json!({
        "customerData": {
            "orderFrequency": 20.0, "avgOrderValue": 3000.0, "daysSinceLastOrder": 4.0,
            "serviceVariety": 4.0, "satisfactionScore": 4.8, "referralCount": 2.0,
            "discountUsage": 1.0, "complaintCount": 0.0
        }
    })
}

fn training_orders() -> Value {
    json!({
        "orders": [
            {"userOrderCount": 14, "totalAmount": 2800.0,
             "createdAt": "2026-08-26T10:00:00Z",
             "items": [{"serviceType": "dry_cleaning"}]},
            {"userOrderCount": 12, "totalAmount": 2500.0,
             "createdAt": "2026-08-22T10:00:00Z",
             "items": [{"serviceType": "dry_cleaning"}]},
            {"userOrderCount": 4, "totalAmount": 450.0,
             "createdAt": "2026-08-01T10:00:00Z",
             "items": [{"serviceType": "wash_and_fold"}]},
            {"userOrderCount": 7, "totalAmount": 950.0,
             "createdAt": "2026-08-14T10:00:00Z",
             "items": [{"serviceType": "ironing"}]}
        ]
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_train_then_predict_segment() {
    let app = app();

    for family in ["tree", "svm"] {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/segments/{family}/train"),
            Some(training_customers()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sampleCount"], 7);
        assert_eq!(body["skipped"], 0);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/segments/{family}/predict"),
            Some(premium_probe()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // Prediction nests under a `segment` key.
        assert!(body["segment"].is_object());
        assert_eq!(body["segment"]["segment"], "premium");
        assert!(body["segment"]["confidence"].as_f64().unwrap() > 0.5);
    }
}

#[tokio::test]
async fn test_predict_before_training_returns_fallback() {
    let app = app();
    let (status, body) = send(&app, "POST", "/v1/segments/tree/predict", Some(premium_probe())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["segment"].is_object());
    assert_eq!(body["segment"]["segment"], "regular");
    assert_eq!(body["segment"]["confidence"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn test_unknown_family_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/segments/forest/train",
        Some(training_customers()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_segment_label_is_rejected() {
    let app = app();
    let payload = json!({
        "customers": [
            {"orderFrequency": 5.0, "avgOrderValue": 500.0, "daysSinceLastOrder": 10.0,
             "serviceVariety": 2.0, "satisfactionScore": 3.0, "referralCount": 0.0,
             "discountUsage": 1.0, "complaintCount": 0.0, "segment": "platinum"}
        ]
    });

    let (status, body) = send(&app, "POST", "/v1/segments/tree/train", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_LABEL");
}

#[tokio::test]
async fn test_empty_training_batch_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/segments/tree/train",
        Some(json!({"customers": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_service_prediction_endpoints() {
    let app = app();

    let (status, body) = send(&app, "POST", "/v1/services/train", Some(training_orders())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sampleCount"], 4);

    let history = json!({
        "userOrderHistory": [
            {"userOrderCount": 13, "totalAmount": 2600.0,
             "createdAt": "2026-08-27T10:00:00Z",
             "items": [{"serviceType": "dry_cleaning"}]}
        ]
    });

    let (status, body) = send(&app, "POST", "/v1/services/predict", Some(history.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "dry_cleaning");

    let (status, body) = send(&app, "POST", "/v1/services/probabilities", Some(history)).await;
    assert_eq!(status, StatusCode::OK);
    let probabilities = body["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 3);
    let total: f64 = probabilities.values().map(|v| v.as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_service_prediction_before_training_is_null() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/services/predict",
        Some(json!({"userOrderHistory": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].is_null());
}

#[tokio::test]
async fn test_recommendation_endpoints() {
    let app = app();

    let (status, _) = send(
        &app,
        "POST",
        "/v1/recommendations/train",
        Some(training_orders()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let history = json!({
        "userOrderHistory": [
            {"userOrderCount": 13, "totalAmount": 2600.0,
             "createdAt": "2026-08-27T10:00:00Z",
             "items": [{"serviceType": "dry_cleaning"}]}
        ]
    });

    let (status, body) = send(&app, "POST", "/v1/recommendations", Some(history)).await;
    assert_eq!(status, StatusCode::OK);
    let recommendations = body["recommendations"].as_array().unwrap();
    assert!(!recommendations.is_empty());
    assert_eq!(recommendations[0]["service"], "dry_cleaning");
    assert!(recommendations[0]["reason"].as_str().unwrap().len() > 0);

    // Empty history means nothing to anchor on.
    let (status, body) = send(
        &app,
        "POST",
        "/v1/recommendations",
        Some(json!({"userOrderHistory": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["recommendations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_model_status_lifecycle() {
    let app = app();

    let (status, body) = send(&app, "GET", "/v1/models/status", None).await;
    assert_eq!(status, StatusCode::OK);
    for family in ["tree", "svm", "bayes", "knn"] {
        assert_eq!(body[family]["trained"], false);
        assert_eq!(body[family]["sampleCount"], 0);
    }

    send(&app, "POST", "/v1/services/train", Some(training_orders())).await;

    let (_, body) = send(&app, "GET", "/v1/models/status", None).await;
    assert_eq!(body["bayes"]["trained"], true);
    assert_eq!(body["bayes"]["sampleCount"], 4);
    assert!(body["bayes"]["trainedAt"].is_string());
    assert_eq!(body["tree"]["trained"], false);
}

#[tokio::test]
async fn test_feature_importance_endpoint() {
    let app = app();

    // Untrained family answers with a conflict.
    let (status, body) = send(&app, "GET", "/v1/models/tree/importance", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MODEL_NOT_TRAINED");

    send(
        &app,
        "POST",
        "/v1/segments/tree/train",
        Some(training_customers()),
    )
    .await;

    let (status, body) = send(&app, "GET", "/v1/models/tree/importance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["family"], "tree");
    assert_eq!(body["importance"].as_object().unwrap().len(), 8);

    // Distance-based families have no importance vector.
    let (status, body) = send(&app, "GET", "/v1/models/knn/importance", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_OPERATION");
}

#[tokio::test]
async fn test_non_finite_feature_is_rejected() {
    let app = app();
    // JSON has no NaN, but a missing field surfaces as a deserialization
    // failure before the engine is reached.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/segments/tree/predict",
        Some(json!({"customerData": {"orderFrequency": 5.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
