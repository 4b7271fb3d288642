//! HTTP client for the research automation webhook.
//!
//! One POST per submission, no retries, platform-default timeout. The
//! webhook is an external collaborator with an unstable response schema, so
//! this module only classifies transport-level outcomes; interpreting the
//! body belongs to the normalizer.

use crate::error::SubmitError;
use crate::types::ResearchRequest;

/// Compiled-in endpoint, used when no override is configured.
const DEFAULT_WEBHOOK_URL: &str = "https://automation.researchdesk.app/webhook/company-research";

/// Env var that overrides the compiled-in webhook endpoint.
pub const WEBHOOK_URL_ENV: &str = "RESEARCH_WEBHOOK_URL";

pub struct WebhookClient {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Resolve the endpoint from [`WEBHOOK_URL_ENV`], falling back to the
    /// compiled-in default.
    pub fn from_env() -> Self {
        let endpoint = std::env::var(WEBHOOK_URL_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string());
        Self::new(endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit the payload and return the raw response body.
    ///
    /// Validation failures short-circuit before any network traffic. The
    /// body comes back untouched, even when it is not JSON, because the
    /// normalizer is the one responsible for making sense of it.
    pub async fn submit(&self, payload: &ResearchRequest) -> Result<String, SubmitError> {
        payload.validate()?;

        log::info!(
            "Submitting research request for '{}' to {}",
            payload.company_name.trim(),
            self.endpoint
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::warn!("Webhook answered {} for research request", status);
            return Err(SubmitError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        resp.text()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))
    }
}
