use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::ResilienceConfig;

use super::domain::ApplicantKey;

/// External verification calls issued while driving a loan forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Identity,
    Fraud,
    BureauScore,
}

impl StepKind {
    pub const fn label(self) -> &'static str {
        match self {
            StepKind::Identity => "identity",
            StepKind::Fraud => "fraud",
            StepKind::BureauScore => "bureau_score",
        }
    }
}

/// Raw success payload from a verification dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepPayload(pub Value);

impl StepPayload {
    /// Bureau responses carry the fetched score under a `score` key.
    pub fn bureau_score(&self) -> Option<u16> {
        self.0
            .get("score")
            .and_then(Value::as_u64)
            .and_then(|score| u16::try_from(score).ok())
    }
}

/// Transport-level failure of a single call attempt, classified by the
/// gateway into the HTTP-equivalent spaces the retry policy cares about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// 4xx-equivalent: the request itself was rejected.
    #[error("request rejected: {reason}")]
    Rejected { reason: String },
    /// 5xx-equivalent status from the dependency.
    #[error("upstream error: {reason}")]
    Upstream { reason: String },
    /// Connection refused, reset, DNS failure, or similar transport fault.
    #[error("connection failed: {reason}")]
    Connection { reason: String },
}

impl GatewayError {
    const fn is_permanent(&self) -> bool {
        matches!(self, GatewayError::Rejected { .. })
    }
}

/// Pooled clients for the verification dependencies. Implementations hold no
/// per-application state and are safe to share across concurrent requests.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    async fn call(
        &self,
        step: StepKind,
        applicant: &ApplicantKey,
    ) -> Result<StepPayload, GatewayError>;
}

/// Resilience policy applied uniformly to every verification call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(6),
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&ResilienceConfig> for RetryPolicy {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            call_timeout: config.call_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `failed_attempt` (1-based):
    /// base delay after the first failure, doubling per failure, capped.
    fn backoff_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }
}

/// Failure of a fully-executed step, after the policy has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// The dependency rejected the input; retrying unchanged cannot help.
    Permanent { reason: String },
    /// Every allowed attempt failed on a transient fault.
    TransientExhausted { attempts: u32, reason: String },
}

/// Executes one external verification call with timeout, classification, and
/// exponential backoff. Mutates nothing locally; recording success is the
/// caller's job.
pub struct StepExecutor<G> {
    gateway: Arc<G>,
    policy: RetryPolicy,
}

impl<G> StepExecutor<G>
where
    G: VerificationGateway,
{
    pub fn new(gateway: Arc<G>, policy: RetryPolicy) -> Self {
        Self { gateway, policy }
    }

    pub async fn execute(
        &self,
        step: StepKind,
        applicant: &ApplicantKey,
    ) -> Result<StepPayload, StepFailure> {
        let mut last_reason = String::new();

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                sleep(self.policy.backoff_after(attempt - 1)).await;
            }

            match timeout(self.policy.call_timeout, self.gateway.call(step, applicant)).await {
                Ok(Ok(payload)) => {
                    info!(step = step.label(), attempt, "verification step succeeded");
                    return Ok(payload);
                }
                Ok(Err(err)) if err.is_permanent() => {
                    warn!(step = step.label(), attempt, %err, "verification step rejected the request");
                    return Err(StepFailure::Permanent {
                        reason: err.to_string(),
                    });
                }
                Ok(Err(err)) => {
                    warn!(step = step.label(), attempt, %err, "transient verification failure");
                    last_reason = err.to_string();
                }
                Err(_) => {
                    warn!(
                        step = step.label(),
                        attempt,
                        timeout_ms = self.policy.call_timeout.as_millis() as u64,
                        "verification call timed out"
                    );
                    last_reason = format!(
                        "call timed out after {}ms",
                        self.policy.call_timeout.as_millis()
                    );
                }
            }
        }

        Err(StepFailure::TransientExhausted {
            attempts: self.policy.max_attempts,
            reason: last_reason,
        })
    }
}
