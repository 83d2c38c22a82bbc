use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryLoanRepository};
use crate::routes::with_loan_routes;
use crate::rules::TableDecisionEngine;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use loan_orchestrator::config::AppConfig;
use loan_orchestrator::error::AppError;
use loan_orchestrator::telemetry;
use loan_orchestrator::workflows::loan::{
    DecisionAdapter, HttpVerificationGateway, LoanOrchestrator, RetryPolicy, StepExecutor,
};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // One pooled client shared by every request; the step executor layers
    // per-call timeouts on top, so the client itself only bounds the pool.
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(20)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()?;

    let gateway = Arc::new(HttpVerificationGateway::new(
        client,
        config.verification.clone(),
    ));
    let repository = Arc::new(InMemoryLoanRepository::default());
    let engine = Arc::new(TableDecisionEngine);

    let orchestrator = Arc::new(LoanOrchestrator::new(
        repository,
        StepExecutor::new(gateway, RetryPolicy::from(&config.resilience)),
        DecisionAdapter::new(engine),
    ));

    let app = with_loan_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan evaluation orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
