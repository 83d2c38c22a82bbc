use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::domain::LoanSubmission;
use super::machine::WorkflowEvent;

/// Flat projection handed to the rule-evaluation engine. Identity and fraud
/// outcomes are not carried verbatim; reaching this point already implies
/// clearance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionInput {
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
    pub debt_ratio: f64,
    pub bureau_score: u16,
}

impl DecisionInput {
    pub fn project(submission: &LoanSubmission, bureau_score: u16) -> Self {
        Self {
            pan_number: submission.pan_number.clone(),
            age: submission.age,
            monthly_income: submission.monthly_income,
            employment_duration_months: submission.employment_duration_months,
            existing_debt: submission.existing_debt,
            loan_requested: submission.loan_requested,
            state: submission.state.clone(),
            city: submission.city.clone(),
            city_tier: submission.city_tier.clone(),
            pin_code: submission.pin_code.clone(),
            disaster_affected_area: submission.disaster_affected_area,
            address_duration_months: submission.address_duration_months,
            work_location_matches_residence: submission.work_location_matches_residence,
            debt_ratio: submission.debt_ratio(),
            bureau_score,
        }
    }
}

/// Label the engine attaches to its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionLabel {
    Approved,
    Review,
    Rejected,
}

/// Structured decision result, validated once at this boundary instead of
/// trusting a dictionary shape throughout the call chain. A verdict flagged
/// for manual review may omit the label; otherwise the label is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    #[serde(default)]
    pub decision: Option<DecisionLabel>,
    #[serde(default)]
    pub approved_amount: f64,
    #[serde(default)]
    pub manual_review: bool,
    #[serde(default)]
    pub risk_assessment: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub interest_rate: Option<String>,
}

/// Opaque rule-evaluation function. Pure and side-effect-free from the
/// workflow's perspective; its rule content is not this crate's concern.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn evaluate(&self, input: &DecisionInput) -> Result<Value, DecisionEngineFailure>;
}

/// Rule evaluation that did not produce a usable verdict. Deliberately not a
/// business outcome: an unavailable engine must never read as `rejected`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionEngineFailure {
    #[error("decision engine unavailable: {0}")]
    Unavailable(String),
    #[error("decision engine returned a malformed result: {0}")]
    Malformed(String),
}

/// Invokes the engine and maps its verdict onto a terminal transition.
pub struct DecisionAdapter<E> {
    engine: Arc<E>,
}

impl<E> DecisionAdapter<E>
where
    E: DecisionEngine,
{
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    pub async fn decide(
        &self,
        input: &DecisionInput,
    ) -> Result<(DecisionOutcome, WorkflowEvent), DecisionEngineFailure> {
        let raw = self.engine.evaluate(input).await?;

        if raw.is_null() || raw.as_object().is_some_and(|map| map.is_empty()) {
            return Err(DecisionEngineFailure::Malformed(
                "engine returned an empty result".to_string(),
            ));
        }

        let outcome: DecisionOutcome = serde_json::from_value(raw)
            .map_err(|err| DecisionEngineFailure::Malformed(err.to_string()))?;

        let event = if outcome.manual_review {
            WorkflowEvent::ReviewRequired
        } else {
            match outcome.decision {
                Some(DecisionLabel::Approved) => WorkflowEvent::Approve,
                Some(_) => WorkflowEvent::Reject,
                // A verdict with neither a label nor the review flag carries
                // no usable decision at all.
                None => {
                    return Err(DecisionEngineFailure::Malformed(
                        "result carries neither a decision label nor a review flag".to_string(),
                    ))
                }
            }
        };

        info!(
            decision = ?outcome.decision,
            manual_review = outcome.manual_review,
            "decision engine verdict mapped"
        );

        Ok((outcome, event))
    }
}
