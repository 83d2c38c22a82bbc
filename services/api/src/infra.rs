use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;

use loan_orchestrator::workflows::loan::{
    ApplicantKey, LoanId, LoanRecord, LoanRepository, RepositoryError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Version-checked in-memory store. Stands in for the durable database in
/// development and demos while honoring the full save contract.
#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanRepository {
    records: Arc<Mutex<HashMap<LoanId, LoanRecord>>>,
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn create(&self, record: LoanRecord) -> Result<LoanRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let duplicate = guard.values().any(|existing| {
            existing.applicant_key == record.applicant_key && !existing.state.is_terminal()
        });
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
