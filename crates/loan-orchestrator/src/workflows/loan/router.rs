use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::error::AppError;

use super::decision::DecisionEngine;
use super::domain::{EvaluationRequest, LoanId};
use super::repository::LoanRepository;
use super::service::{LoanOrchestrator, OrchestrationError};
use super::steps::VerificationGateway;

/// Router builder exposing HTTP endpoints for evaluation, status, and
/// manual approval.
pub fn loan_router<R, G, E>(orchestrator: Arc<LoanOrchestrator<R, G, E>>) -> Router
where
    R: LoanRepository + 'static,
    G: VerificationGateway + 'static,
    E: DecisionEngine + 'static,
{
    Router::new()
        .route("/api/v1/loans/evaluate", post(evaluate_handler::<R, G, E>))
        .route("/api/v1/loans/:loan_id", get(status_handler::<R, G, E>))
        .route(
            "/api/v1/loans/:loan_id/approve",
            post(approve_handler::<R, G, E>),
        )
        .with_state(orchestrator)
}

pub(crate) async fn evaluate_handler<R, G, E>(
    State(orchestrator): State<Arc<LoanOrchestrator<R, G, E>>>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Result<Response, AppError>
where
    R: LoanRepository + 'static,
    G: VerificationGateway + 'static,
    E: DecisionEngine + 'static,
{
    let record = orchestrator.evaluate(request).await?;
    Ok((StatusCode::OK, axum::Json(record.status_view())).into_response())
}

pub(crate) async fn status_handler<R, G, E>(
    State(orchestrator): State<Arc<LoanOrchestrator<R, G, E>>>,
    Path(loan_id): Path<String>,
) -> Result<Response, AppError>
where
    R: LoanRepository + 'static,
    G: VerificationGateway + 'static,
    E: DecisionEngine + 'static,
{
    let record = orchestrator.status(&LoanId(loan_id)).await?;
    Ok((StatusCode::OK, axum::Json(record.status_view())).into_response())
}

pub(crate) async fn approve_handler<R, G, E>(
    State(orchestrator): State<Arc<LoanOrchestrator<R, G, E>>>,
    Path(loan_id): Path<String>,
) -> Response
where
    R: LoanRepository + 'static,
    G: VerificationGateway + 'static,
    E: DecisionEngine + 'static,
{
    match orchestrator.approve(&LoanId(loan_id)).await {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        // For the manual action an out-of-order request is the caller's
        // mistake, not an internal fault.
        Err(OrchestrationError::IllegalTransition(err)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => AppError::from(other).into_response(),
    }
}
