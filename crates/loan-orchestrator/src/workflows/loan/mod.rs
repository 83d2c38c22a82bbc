//! Resumable loan evaluation workflow.
//!
//! An application moves along a fixed forward-only path — identity check,
//! fraud check, bureau score fetch, then a declarative decision — and its
//! position is persisted after every transition. A failure at any step
//! leaves the record where it was, so a later request resumes exactly there
//! without re-running completed verifications.

pub mod decision;
pub mod domain;
pub mod gateway;
pub mod machine;
pub mod repository;
pub mod router;
pub mod service;
pub mod steps;

#[cfg(test)]
mod tests;

pub use decision::{
    DecisionAdapter, DecisionEngine, DecisionEngineFailure, DecisionInput, DecisionLabel,
    DecisionOutcome,
};
pub use domain::{ApplicantKey, EvaluationRequest, LoanId, LoanSubmission, WorkflowState};
pub use gateway::HttpVerificationGateway;
pub use machine::{transition, IllegalTransition, WorkflowEvent};
pub use repository::{LoanRecord, LoanRepository, LoanStatusView, RepositoryError};
pub use router::loan_router;
pub use service::{LoanOrchestrator, OrchestrationError};
pub use steps::{
    GatewayError, RetryPolicy, StepExecutor, StepFailure, StepKind, StepPayload,
    VerificationGateway,
};
