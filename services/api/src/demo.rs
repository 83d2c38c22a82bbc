use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Args;
use serde_json::json;

use loan_orchestrator::error::AppError;
use loan_orchestrator::workflows::loan::{
    ApplicantKey, DecisionAdapter, EvaluationRequest, GatewayError, LoanOrchestrator,
    LoanSubmission, RetryPolicy, StepExecutor, StepKind, StepPayload, VerificationGateway,
    WorkflowState,
};

use crate::infra::InMemoryLoanRepository;
use crate::rules::TableDecisionEngine;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// PAN to evaluate (defaults to a well-formed sample)
    #[arg(long)]
    pub(crate) pan: Option<String>,
    /// Simulate a bureau score in the manual-review band
    #[arg(long)]
    pub(crate) manual_review: bool,
    /// Inject two transient fraud-service failures to show the retry policy
    #[arg(long)]
    pub(crate) flaky_fraud: bool,
}

/// Offline gateway used by the CLI demo so no external services are needed.
struct SimulatedGateway {
    bureau_score: u16,
    fraud_failures_remaining: AtomicU32,
}

#[async_trait]
impl VerificationGateway for SimulatedGateway {
    async fn call(
        &self,
        step: StepKind,
        applicant: &ApplicantKey,
    ) -> Result<StepPayload, GatewayError> {
        match step {
            StepKind::Identity => Ok(StepPayload(
                json!({ "valid": true, "status": "verified", "pan": applicant.0 }),
            )),
            StepKind::Fraud => {
                let remaining = self.fraud_failures_remaining.load(Ordering::SeqCst);
                if remaining > 0 {
                    self.fraud_failures_remaining
                        .fetch_sub(1, Ordering::SeqCst);
                    return Err(GatewayError::Upstream {
                        reason: "503 Service Unavailable".to_string(),
                    });
                }
                Ok(StepPayload(
                    json!({ "success": true, "risk_score": "low", "status": "clear" }),
                ))
            }
            StepKind::BureauScore => Ok(StepPayload(
                json!({ "score": self.bureau_score, "provider": "TransUnion CIBIL" }),
            )),
        }
    }
}

fn sample_submission(pan: String) -> LoanSubmission {
    LoanSubmission {
        pan_number: pan,
        age: 31,
        monthly_income: 75_000.0,
        employment_duration_months: 42,
        existing_debt: 10_000.0,
        loan_requested: 500_000.0,
        state: "Maharashtra".to_string(),
        city: "Pune".to_string(),
        city_tier: "Tier-1".to_string(),
        pin_code: "411001".to_string(),
        disaster_affected_area: false,
        address_duration_months: 36,
        work_location_matches_residence: true,
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        pan,
        manual_review,
        flaky_fraud,
    } = args;

    let gateway = Arc::new(SimulatedGateway {
        bureau_score: if manual_review { 650 } else { 760 },
        fraud_failures_remaining: AtomicU32::new(if flaky_fraud { 2 } else { 0 }),
    });
    let repository = Arc::new(InMemoryLoanRepository::default());
    let engine = Arc::new(TableDecisionEngine);

    let policy = RetryPolicy {
        base_delay: Duration::from_millis(100),
        ..RetryPolicy::default()
    };
    let orchestrator = LoanOrchestrator::new(
        repository,
        StepExecutor::new(gateway, policy),
        DecisionAdapter::new(engine),
    );

    let submission = sample_submission(pan.unwrap_or_else(|| "ABCDE1234F".to_string()));
    let record = orchestrator
        .evaluate(EvaluationRequest {
            loan_id: None,
            submission,
        })
        .await
        .map_err(AppError::from)?;

    println!("== evaluation result ==");
    println!(
        "{}",
        serde_json::to_string_pretty(&record.status_view()).expect("view serializes")
    );

    if record.state == WorkflowState::PendingReview {
        let approved = orchestrator
            .approve(&record.id)
            .await
            .map_err(AppError::from)?;
        println!("== after manual approval ==");
        println!(
            "{}",
            serde_json::to_string_pretty(&approved.status_view()).expect("view serializes")
        );
    }

    Ok(())
}
