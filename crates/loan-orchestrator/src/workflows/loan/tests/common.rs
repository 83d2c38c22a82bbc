use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::workflows::loan::decision::{
    DecisionAdapter, DecisionEngine, DecisionEngineFailure, DecisionInput,
};
use crate::workflows::loan::domain::{ApplicantKey, EvaluationRequest, LoanId, LoanSubmission};
use crate::workflows::loan::repository::{LoanRecord, LoanRepository, RepositoryError};
use crate::workflows::loan::service::LoanOrchestrator;
use crate::workflows::loan::steps::{
    GatewayError, RetryPolicy, StepExecutor, StepKind, StepPayload, VerificationGateway,
};

pub(super) fn submission() -> LoanSubmission {
    LoanSubmission {
        pan_number: "ABCDE1234F".to_string(),
        age: 32,
        monthly_income: 85_000.0,
        employment_duration_months: 48,
        existing_debt: 12_000.0,
        loan_requested: 400_000.0,
        state: "Karnataka".to_string(),
        city: "Bengaluru".to_string(),
        city_tier: "Tier-1".to_string(),
        pin_code: "560001".to_string(),
        disaster_affected_area: false,
        address_duration_months: 30,
        work_location_matches_residence: true,
    }
}

pub(super) fn evaluation_request() -> EvaluationRequest {
    EvaluationRequest {
        loan_id: None,
        submission: submission(),
    }
}

pub(super) fn approved_verdict() -> Value {
    json!({
        "decision": "APPROVED",
        "approved_amount": 400_000.0,
        "manual_review": false,
        "risk_assessment": "LOW",
        "reason": "meets published criteria",
        "interest_rate": "10.5%"
    })
}

pub(super) fn review_verdict() -> Value {
    json!({
        "decision": "REVIEW",
        "manual_review": true,
        "risk_assessment": "MEDIUM",
        "reason": "borderline bureau score"
    })
}

/// Policy small enough for paused-clock tests while keeping the shape of the
/// production defaults.
pub(super) fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(400),
        call_timeout: Duration::from_secs(1),
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<LoanId, LoanRecord>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: &LoanId) -> Option<LoanRecord> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }

    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

#[async_trait]
impl LoanRepository for MemoryRepository {
    async fn create(&self, record: LoanRecord) -> Result<LoanRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let duplicate = guard
            .values()
            .any(|existing| existing.applicant_key == record.applicant_key && !existing.state.is_terminal());
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn find_active(
        &self,
        key: &ApplicantKey,
    ) -> Result<Option<LoanRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.applicant_key == *key && !record.state.is_terminal())
            .cloned())
    }

    async fn save(
        &self,
        mut record: LoanRecord,
        expected_version: u64,
    ) -> Result<LoanRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::ConcurrentModification {
                expected: expected_version,
                found: stored.version,
            });
        }
        record.version = expected_version + 1;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

/// Repository wrapper that loses every optimistic-concurrency race.
pub(super) struct RacingRepository {
    pub(super) inner: Arc<MemoryRepository>,
}

#[async_trait]
impl LoanRepository for RacingRepository {
    async fn create(&self, record: LoanRecord) -> Result<LoanRecord, RepositoryError> {
        self.inner.create(record).await
    }

    async fn find(&self, id: &LoanId) -> Result<Option<LoanRecord>, RepositoryError> {
        self.inner.find(id).await
    }

    async fn find_active(
        &self,
        key: &ApplicantKey,
    ) -> Result<Option<LoanRecord>, RepositoryError> {
        self.inner.find_active(key).await
    }

    async fn save(
        &self,
        record: LoanRecord,
        expected_version: u64,
    ) -> Result<LoanRecord, RepositoryError> {
        Err(RepositoryError::ConcurrentModification {
            expected: expected_version,
            found: record.version + 1,
        })
    }
}

/// Gateway returning scripted results per step, falling back to a plausible
/// success payload once a script runs dry. Records the paused-clock instant
/// of every attempt so backoff spacing can be asserted.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    scripts: Mutex<HashMap<StepKind, VecDeque<Result<StepPayload, GatewayError>>>>,
    calls: Mutex<Vec<(StepKind, Instant)>>,
}

impl ScriptedGateway {
    pub(super) fn script(
        &self,
        step: StepKind,
        results: impl IntoIterator<Item = Result<StepPayload, GatewayError>>,
    ) {
        self.scripts
            .lock()
            .expect("script mutex poisoned")
            .entry(step)
            .or_default()
            .extend(results);
    }

    pub(super) fn calls(&self, step: StepKind) -> usize {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .iter()
            .filter(|(kind, _)| *kind == step)
            .count()
    }

    pub(super) fn total_calls(&self) -> usize {
        self.calls.lock().expect("call log mutex poisoned").len()
    }

    pub(super) fn instants(&self, step: StepKind) -> Vec<Instant> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .iter()
            .filter(|(kind, _)| *kind == step)
            .map(|(_, at)| *at)
            .collect()
    }
}

pub(super) fn upstream_error() -> GatewayError {
    GatewayError::Upstream {
        reason: "503 Service Unavailable".to_string(),
    }
}

pub(super) fn rejected_error(reason: &str) -> GatewayError {
    GatewayError::Rejected {
        reason: reason.to_string(),
    }
}

pub(super) fn success_payload(step: StepKind) -> StepPayload {
    let body = match step {
        StepKind::Identity => json!({ "valid": true, "status": "verified" }),
        StepKind::Fraud => json!({ "status": "clear", "risk_score": "low" }),
        StepKind::BureauScore => json!({ "score": 750, "provider": "TransUnion CIBIL" }),
    };
    StepPayload(body)
}

#[async_trait]
impl VerificationGateway for ScriptedGateway {
    async fn call(
        &self,
        step: StepKind,
        _applicant: &ApplicantKey,
    ) -> Result<StepPayload, GatewayError> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push((step, Instant::now()));

        let scripted = self
            .scripts
            .lock()
            .expect("script mutex poisoned")
            .get_mut(&step)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(result) => result,
            None => Ok(success_payload(step)),
        }
    }
}

/// Gateway whose calls never complete; exercises the executor's timeout.
pub(super) struct HangingGateway;

#[async_trait]
impl VerificationGateway for HangingGateway {
    async fn call(
        &self,
        _step: StepKind,
        _applicant: &ApplicantKey,
    ) -> Result<StepPayload, GatewayError> {
        std::future::pending().await
    }
}

/// Engine returning a configurable verdict, counting invocations.
pub(super) struct StaticDecisionEngine {
    result: Mutex<Result<Value, DecisionEngineFailure>>,
    calls: AtomicU32,
}

impl StaticDecisionEngine {
    pub(super) fn returning(verdict: Value) -> Self {
        Self {
            result: Mutex::new(Ok(verdict)),
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn failing(failure: DecisionEngineFailure) -> Self {
        Self {
            result: Mutex::new(Err(failure)),
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn set_result(&self, result: Result<Value, DecisionEngineFailure>) {
        *self.result.lock().expect("engine mutex poisoned") = result;
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionEngine for StaticDecisionEngine {
    async fn evaluate(&self, _input: &DecisionInput) -> Result<Value, DecisionEngineFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().expect("engine mutex poisoned").clone()
    }
}

pub(super) type TestOrchestrator =
    LoanOrchestrator<MemoryRepository, ScriptedGateway, StaticDecisionEngine>;

pub(super) fn build_orchestrator(
    engine: StaticDecisionEngine,
) -> (
    TestOrchestrator,
    Arc<MemoryRepository>,
    Arc<ScriptedGateway>,
    Arc<StaticDecisionEngine>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let gateway = Arc::new(ScriptedGateway::default());
    let engine = Arc::new(engine);

    let orchestrator = LoanOrchestrator::new(
        repository.clone(),
        StepExecutor::new(gateway.clone(), fast_policy()),
        DecisionAdapter::new(engine.clone()),
    );

    (orchestrator, repository, gateway, engine)
}
