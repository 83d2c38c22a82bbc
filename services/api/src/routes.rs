use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use serde_json::json;

use loan_orchestrator::workflows::loan::{
    loan_router, DecisionEngine, LoanOrchestrator, LoanRepository, VerificationGateway,
};

use crate::infra::AppState;
use crate::mocks::mock_router;

pub(crate) fn with_loan_routes<R, G, E>(orchestrator: Arc<LoanOrchestrator<R, G, E>>) -> Router
where
    R: LoanRepository + 'static,
    G: VerificationGateway + 'static,
    E: DecisionEngine + 'static,
{
    loan_router(orchestrator)
        .merge(mock_router())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
