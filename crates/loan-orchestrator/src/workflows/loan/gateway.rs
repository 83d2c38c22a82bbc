use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::VerificationConfig;

use super::domain::ApplicantKey;
use super::steps::{GatewayError, StepKind, StepPayload, VerificationGateway};

/// reqwest-backed gateway posting `{"pan": ...}` to the configured endpoint
/// for each step. One instance shares a single pooled client across every
/// concurrent request; the executor owns timeouts and retries.
#[derive(Debug, Clone)]
pub struct HttpVerificationGateway {
    client: reqwest::Client,
    config: VerificationConfig,
}

impl HttpVerificationGateway {
    pub fn new(client: reqwest::Client, config: VerificationConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, step: StepKind) -> &str {
        match step {
            StepKind::Identity => &self.config.identity_url,
            StepKind::Fraud => &self.config.fraud_url,
            StepKind::BureauScore => &self.config.bureau_url,
        }
    }
}

#[async_trait]
impl VerificationGateway for HttpVerificationGateway {
    async fn call(
        &self,
        step: StepKind,
        applicant: &ApplicantKey,
    ) -> Result<StepPayload, GatewayError> {
        let response = self
            .client
            .post(self.endpoint(step))
            .json(&json!({ "pan": applicant.0 }))
            .send()
            .await
            .map_err(|err| GatewayError::Connection {
                reason: err.to_string(),
            })?;

        let status = response.status();
        if status.is_client_error() {
            let reason = read_error_detail(response).await;
            return Err(GatewayError::Rejected { reason });
        }
        if !status.is_success() {
            let reason = read_error_detail(response).await;
            return Err(GatewayError::Upstream {
                reason: format!("{status}: {reason}"),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| GatewayError::Upstream {
                reason: format!("unreadable response body: {err}"),
            })?;

        Ok(StepPayload(body))
    }
}

async fn read_error_detail(response: reqwest::Response) -> String {
    match response.json::<Value>().await {
        Ok(body) => body
            .get("detail")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => "no detail provided".to_string(),
    }
}
