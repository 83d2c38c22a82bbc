use serde::{Deserialize, Serialize};

use super::domain::WorkflowState;

/// Events accepted by the loan workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    IdentityPassed,
    FraudPassed,
    ScoreRecorded,
    ReviewRequired,
    Approve,
    Reject,
}

impl WorkflowEvent {
    pub const fn all() -> [Self; 6] {
        [
            Self::IdentityPassed,
            Self::FraudPassed,
            Self::ScoreRecorded,
            Self::ReviewRequired,
            Self::Approve,
            Self::Reject,
        ]
    }
}

/// Raised when an event is not defined for the current state. Indicates a
/// caller driving the workflow out of order, or a core bug when raised from
/// the orchestrator's own loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event {event:?} is not allowed from state '{}'", from.label())]
pub struct IllegalTransition {
    pub from: WorkflowState,
    pub event: WorkflowEvent,
}

/// The complete transition table. Everything not listed here is illegal;
/// there are no backward edges and no edges out of the terminal states.
const TRANSITIONS: &[(WorkflowState, WorkflowEvent, WorkflowState)] = &[
    (
        WorkflowState::Submitted,
        WorkflowEvent::IdentityPassed,
        WorkflowState::IdentityVerified,
    ),
    (
        WorkflowState::IdentityVerified,
        WorkflowEvent::FraudPassed,
        WorkflowState::FraudCleared,
    ),
    (
        WorkflowState::FraudCleared,
        WorkflowEvent::ScoreRecorded,
        WorkflowState::ScoreFetched,
    ),
    (
        WorkflowState::ScoreFetched,
        WorkflowEvent::ReviewRequired,
        WorkflowState::PendingReview,
    ),
    (
        WorkflowState::ScoreFetched,
        WorkflowEvent::Approve,
        WorkflowState::Approved,
    ),
    (
        WorkflowState::ScoreFetched,
        WorkflowEvent::Reject,
        WorkflowState::Rejected,
    ),
    (
        WorkflowState::PendingReview,
        WorkflowEvent::Approve,
        WorkflowState::Approved,
    ),
    (
        WorkflowState::PendingReview,
        WorkflowEvent::Reject,
        WorkflowState::Rejected,
    ),
];

/// Pure transition lookup; holds no record identity.
pub fn transition(
    from: WorkflowState,
    event: WorkflowEvent,
) -> Result<WorkflowState, IllegalTransition> {
    TRANSITIONS
        .iter()
        .find(|(state, candidate, _)| *state == from && *candidate == event)
        .map(|(_, _, next)| *next)
        .ok_or(IllegalTransition { from, event })
}
