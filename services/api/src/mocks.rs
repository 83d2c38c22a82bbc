use std::sync::OnceLock;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

/// Failure injection rate for the fraud mock, matching the flakiness the
/// retry policy is tuned against.
const FRAUD_FAILURE_RATE: f64 = 0.2;

const PAN_PATTERN: &str = "^[A-Z]{5}[0-9]{4}[A-Z]$";

fn pan_regex() -> &'static Regex {
    static PAN: OnceLock<Regex> = OnceLock::new();
    PAN.get_or_init(|| Regex::new(PAN_PATTERN).expect("static pattern compiles"))
}

/// Local stand-ins for the external verification providers so a development
/// instance can exercise its own retry and failure paths end to end.
pub(crate) fn mock_router() -> Router {
    Router::new()
        .route("/mock/identity", post(mock_identity))
        .route("/mock/fraud", post(mock_fraud))
        .route("/mock/bureau", post(mock_bureau))
}

async fn mock_identity(Json(payload): Json<Value>) -> impl IntoResponse {
    let pan = payload
        .get("pan")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();

    if !pan_regex().is_match(&pan) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Invalid PAN Format" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({ "valid": true, "status": "verified", "pan": pan })),
    )
}

async fn mock_fraud() -> impl IntoResponse {
    if rand::random::<f64>() < FRAUD_FAILURE_RATE {
        debug!("fraud mock injecting a transient failure");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "Internal Server Error" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({ "success": true, "risk_score": "low", "status": "clear" })),
    )
}

async fn mock_bureau(Json(payload): Json<Value>) -> impl IntoResponse {
    // Simulated provider latency.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let pan = payload
        .get("pan")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    (
        StatusCode::OK,
        Json(json!({ "score": 750, "pan": pan, "provider": "TransUnion CIBIL" })),
    )
}
