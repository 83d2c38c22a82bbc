use serde::{Deserialize, Serialize};

/// Identifier wrapper for loan records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(pub String);

/// External identity correlator (PAN). One non-terminal record may exist per
/// key at a time; repeated evaluation requests resume that record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantKey(pub String);

/// Applicant-provided snapshot captured at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSubmission {
    pub pan_number: String,
    pub age: u8,
    pub monthly_income: f64,
    pub employment_duration_months: u32,
    pub existing_debt: f64,
    pub loan_requested: f64,
    pub state: String,
    pub city: String,
    pub city_tier: String,
    pub pin_code: String,
    pub disaster_affected_area: bool,
    pub address_duration_months: u32,
    pub work_location_matches_residence: bool,
}

impl LoanSubmission {
    pub fn applicant_key(&self) -> ApplicantKey {
        ApplicantKey(self.pan_number.trim().to_ascii_uppercase())
    }

    pub fn debt_ratio(&self) -> f64 {
        if self.monthly_income > 0.0 {
            self.existing_debt / self.monthly_income
        } else {
            1.0
        }
    }
}

/// Inbound evaluation request: resume an identified record, or locate one by
/// applicant key, creating it when none is in flight.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub loan_id: Option<LoanId>,
    #[serde(flatten)]
    pub submission: LoanSubmission,
}

/// Workflow position tracked for every loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Submitted,
    IdentityVerified,
    FraudCleared,
    ScoreFetched,
    PendingReview,
    Approved,
    Rejected,
}

impl WorkflowState {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowState::Submitted => "submitted",
            WorkflowState::IdentityVerified => "identity_verified",
            WorkflowState::FraudCleared => "fraud_cleared",
            WorkflowState::ScoreFetched => "score_fetched",
            WorkflowState::PendingReview => "pending_review",
            WorkflowState::Approved => "approved",
            WorkflowState::Rejected => "rejected",
        }
    }

    /// Terminal states have no outgoing transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Approved | WorkflowState::Rejected)
    }

    pub const fn all() -> [Self; 7] {
        [
            Self::Submitted,
            Self::IdentityVerified,
            Self::FraudCleared,
            Self::ScoreFetched,
            Self::PendingReview,
            Self::Approved,
            Self::Rejected,
        ]
    }
}
