use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::decision::{DecisionLabel, DecisionOutcome};
use super::domain::{ApplicantKey, LoanId, LoanSubmission, WorkflowState};

/// Durable record tracking one loan application through the workflow.
///
/// `bureau_score` and `decision_metadata` are write-once: the drive loop sets
/// each exactly once because the transition that records it cannot recur on
/// the forward-only state path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub applicant_key: ApplicantKey,
    pub state: WorkflowState,
    pub submission: LoanSubmission,
    pub bureau_score: Option<u16>,
    pub decision_metadata: Option<DecisionOutcome>,
    pub approved_amount: f64,
    pub risk_assessment: Option<String>,
    pub interest_rate: Option<String>,
    /// Incremented by the store on every persisted mutation; writes carry the
    /// version they read and fail on mismatch.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRecord {
    pub fn new(submission: LoanSubmission) -> Self {
        let now = Utc::now();
        Self {
            id: LoanId(Uuid::new_v4().to_string()),
            applicant_key: submission.applicant_key(),
            state: WorkflowState::Submitted,
            submission,
            bureau_score: None,
            decision_metadata: None,
            approved_amount: 0.0,
            risk_assessment: None,
            interest_rate: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn decision_rationale(&self) -> String {
        match &self.decision_metadata {
            Some(outcome) => outcome
                .reason
                .clone()
                .unwrap_or_else(|| "no reason provided".to_string()),
            None => format!("pending {}", self.next_obligation()),
        }
    }

    fn next_obligation(&self) -> &'static str {
        match self.state {
            WorkflowState::Submitted => "identity verification",
            WorkflowState::IdentityVerified => "fraud clearance",
            WorkflowState::FraudCleared => "bureau score fetch",
            WorkflowState::ScoreFetched => "decision evaluation",
            WorkflowState::PendingReview => "manual review",
            WorkflowState::Approved | WorkflowState::Rejected => "nothing",
        }
    }

    pub fn status_view(&self) -> LoanStatusView {
        LoanStatusView {
            loan_id: self.id.clone(),
            status: self.state.label(),
            bureau_score: self.bureau_score,
            decision: self.decision_metadata.as_ref().and_then(|d| d.decision),
            decision_rationale: self.decision_rationale(),
            manual_review_required: self.state == WorkflowState::PendingReview,
            approved_amount: self.approved_amount,
            risk_assessment: self.risk_assessment.clone(),
            interest_rate: self.interest_rate.clone(),
            version: self.version,
        }
    }
}

/// Storage abstraction so the orchestrator can be exercised in isolation.
///
/// `save` must compare `expected_version` against the stored row and reject
/// the write on mismatch; the successful result carries the bumped version.
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn create(&self, record: LoanRecord) -> Result<LoanRecord, RepositoryError>;
    async fn find(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError>;
    /// The non-terminal record for this applicant, if one is in flight.
    async fn find_active(&self, key: &ApplicantKey)
        -> Result<Option<LoanRecord>, RepositoryError>;
    async fn save(
        &self,
        record: LoanRecord,
        expected_version: u64,
    ) -> Result<LoanRecord, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("loan record not found")]
    NotFound,
    #[error("an in-flight application already exists for this applicant")]
    Conflict,
    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    ConcurrentModification { expected: u64, found: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized snapshot of a record's externally visible status.
#[derive(Debug, Clone, Serialize)]
pub struct LoanStatusView {
    pub loan_id: LoanId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bureau_score: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionLabel>,
    pub decision_rationale: String,
    pub manual_review_required: bool,
    pub approved_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<String>,
    pub version: u64,
}
