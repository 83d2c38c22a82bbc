use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::decision::{DecisionAdapter, DecisionEngine, DecisionEngineFailure, DecisionInput};
use super::domain::{EvaluationRequest, LoanId, WorkflowState};
use super::machine::{self, IllegalTransition, WorkflowEvent};
use super::repository::{LoanRecord, LoanRepository, RepositoryError};
use super::steps::{StepExecutor, StepFailure, StepKind, VerificationGateway};

/// Failure taxonomy surfaced by the orchestrator. Every fault from the step
/// executor, decision adapter, and store is translated into exactly one of
/// these kinds; none is downgraded to a business outcome.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("{} verification rejected the submission: {reason}", step.label())]
    PermanentFailure { step: StepKind, reason: String },
    #[error("{} verification unavailable after {attempts} attempts: {reason}", step.label())]
    TransientFailureExhausted {
        step: StepKind,
        attempts: u32,
        reason: String,
    },
    #[error("{} verification returned an unusable payload", step.label())]
    MalformedStepPayload { step: StepKind },
    #[error(transparent)]
    DecisionEngine(#[from] DecisionEngineFailure),
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Drives one loan application as far forward as currently possible,
/// persisting after every successful transition so any interruption resumes
/// at the last durable state.
pub struct LoanOrchestrator<R, G, E> {
    repository: Arc<R>,
    executor: StepExecutor<G>,
    adapter: DecisionAdapter<E>,
}

impl<R, G, E> LoanOrchestrator<R, G, E>
where
    R: LoanRepository + 'static,
    G: VerificationGateway + 'static,
    E: DecisionEngine + 'static,
{
    pub fn new(repository: Arc<R>, executor: StepExecutor<G>, adapter: DecisionAdapter<E>) -> Self {
        Self {
            repository,
            executor,
            adapter,
        }
    }

    /// Create-or-resume, then drive forward once.
    pub async fn evaluate(
        &self,
        request: EvaluationRequest,
    ) -> Result<LoanRecord, OrchestrationError> {
        let EvaluationRequest {
            loan_id,
            submission,
        } = request;

        let record = if let Some(id) = loan_id {
            self.repository
                .find(&id)
                .await?
                .ok_or(RepositoryError::NotFound)?
        } else {
            let key = submission.applicant_key();
            match self.repository.find_active(&key).await? {
                Some(existing) => {
                    info!(
                        loan_id = %existing.id.0,
                        state = existing.state.label(),
                        "resuming in-flight application"
                    );
                    existing
                }
                None => {
                    let created = self.repository.create(LoanRecord::new(submission)).await?;
                    info!(loan_id = %created.id.0, "loan application created");
                    created
                }
            }
        };

        self.drive(record).await
    }

    /// Read-only snapshot; no side effects.
    pub async fn status(&self, id: &LoanId) -> Result<LoanRecord, OrchestrationError> {
        Ok(self
            .repository
            .find(id)
            .await?
            .ok_or(RepositoryError::NotFound)?)
    }

    /// Manual approval is only defined for records parked in review; every
    /// other state is an invalid workflow step for this operation, even
    /// where the machine itself has an `Approve` edge.
    pub async fn approve(&self, id: &LoanId) -> Result<LoanRecord, OrchestrationError> {
        let record = self
            .repository
            .find(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if record.state != WorkflowState::PendingReview {
            return Err(IllegalTransition {
                from: record.state,
                event: WorkflowEvent::Approve,
            }
            .into());
        }

        self.apply(record, WorkflowEvent::Approve).await
    }

    async fn drive(&self, mut record: LoanRecord) -> Result<LoanRecord, OrchestrationError> {
        loop {
            record = match record.state {
                WorkflowState::Submitted => {
                    self.run_step(record, StepKind::Identity, WorkflowEvent::IdentityPassed)
                        .await?
                }
                WorkflowState::IdentityVerified => {
                    self.run_step(record, StepKind::Fraud, WorkflowEvent::FraudPassed)
                        .await?
                }
                WorkflowState::FraudCleared => self.fetch_bureau_score(record).await?,
                WorkflowState::ScoreFetched => self.decide(record).await?,
                // Parked for a human decision, or already terminal.
                WorkflowState::PendingReview
                | WorkflowState::Approved
                | WorkflowState::Rejected => return Ok(record),
            };
        }
    }

    async fn run_step(
        &self,
        record: LoanRecord,
        step: StepKind,
        event: WorkflowEvent,
    ) -> Result<LoanRecord, OrchestrationError> {
        match self.executor.execute(step, &record.applicant_key).await {
            Ok(_payload) => self.apply(record, event).await,
            Err(failure) => Err(classify_step_failure(step, failure)),
        }
    }

    async fn fetch_bureau_score(
        &self,
        mut record: LoanRecord,
    ) -> Result<LoanRecord, OrchestrationError> {
        let step = StepKind::BureauScore;
        let payload = self
            .executor
            .execute(step, &record.applicant_key)
            .await
            .map_err(|failure| classify_step_failure(step, failure))?;

        let Some(score) = payload.bureau_score() else {
            warn!(loan_id = %record.id.0, "bureau responded without a usable score");
            return Err(OrchestrationError::MalformedStepPayload { step });
        };

        record.bureau_score = Some(score);
        self.apply(record, WorkflowEvent::ScoreRecorded).await
    }

    async fn decide(&self, mut record: LoanRecord) -> Result<LoanRecord, OrchestrationError> {
        // The score transition is durably persisted before this point, so a
        // record here without one is corrupted, not mid-flight.
        let Some(score) = record.bureau_score else {
            error!(loan_id = %record.id.0, "record reached score_fetched without a bureau score");
            return Err(OrchestrationError::MalformedStepPayload {
                step: StepKind::BureauScore,
            });
        };

        let input = DecisionInput::project(&record.submission, score);
        let (outcome, event) = self.adapter.decide(&input).await?;

        record.approved_amount = outcome.approved_amount;
        record.risk_assessment = outcome.risk_assessment.clone();
        record.interest_rate = outcome.interest_rate.clone();
        record.decision_metadata = Some(outcome);

        self.apply(record, event).await
    }

    /// Validate the transition, persist under the version read at load time,
    /// and hand back the stored row. Nothing is persisted on any error path.
    async fn apply(
        &self,
        mut record: LoanRecord,
        event: WorkflowEvent,
    ) -> Result<LoanRecord, OrchestrationError> {
        let next = machine::transition(record.state, event)?;
        let expected_version = record.version;

        record.state = next;
        record.updated_at = Utc::now();

        let saved = self.repository.save(record, expected_version).await?;
        info!(
            loan_id = %saved.id.0,
            state = saved.state.label(),
            version = saved.version,
            "workflow advanced"
        );
        Ok(saved)
    }
}

fn classify_step_failure(step: StepKind, failure: StepFailure) -> OrchestrationError {
    match failure {
        StepFailure::Permanent { reason } => OrchestrationError::PermanentFailure { step, reason },
        StepFailure::TransientExhausted { attempts, reason } => {
            OrchestrationError::TransientFailureExhausted {
                step,
                attempts,
                reason,
            }
        }
    }
}
