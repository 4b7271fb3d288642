//! Error types for research submission
//!
//! Errors are classified by where they occur:
//! - Validation: bad form input, caught before any network traffic
//! - Http: the webhook answered with a non-success status
//! - Network: the request never completed (connectivity, DNS, CORS)
//!
//! A malformed response body is deliberately NOT an error. The webhook's
//! output schema is unstable, so unparseable bodies degrade inside the
//! normalizer to a placeholder entry instead of failing the submission.

use thiserror::Error;

/// Errors from a research submission attempt.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),

    #[error("Webhook returned {status} {status_text}: {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(String),
}

impl SubmitError {
    /// Returns true if retrying the same submission could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Http { .. } | SubmitError::Network(_))
    }

    /// Single-line banner text shown to the user.
    ///
    /// Network failures are rewritten with a CORS hint: the webhook is an
    /// external collaborator, and cross-origin rejection is the most common
    /// way a request dies before producing a status code.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(msg) => msg.clone(),
            SubmitError::Http {
                status,
                status_text,
                body,
            } => {
                if body.trim().is_empty() {
                    format!("Research request failed: {} {}", status, status_text)
                } else {
                    format!(
                        "Research request failed: {} {}: {}",
                        status,
                        status_text,
                        body.trim()
                    )
                }
            }
            SubmitError::Network(_) => {
                "Could not reach the research webhook. Check your connection; if this persists, \
                 the endpoint may be rejecting cross-origin requests (CORS)."
                    .to_string()
            }
        }
    }
}

/// Serializable error representation for IPC
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFailure {
    pub message: String,
    pub kind: FailureKind,
    pub can_retry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Validation,
    Http,
    Network,
    Busy,
}

impl SubmissionFailure {
    /// Rejection for a submission attempted while one is already in flight.
    pub fn busy() -> Self {
        SubmissionFailure {
            message: "A research request is already in flight".to_string(),
            kind: FailureKind::Busy,
            can_retry: true,
        }
    }
}

impl From<&SubmitError> for SubmissionFailure {
    fn from(err: &SubmitError) -> Self {
        let kind = match err {
            SubmitError::Validation(_) => FailureKind::Validation,
            SubmitError::Http { .. } => FailureKind::Http,
            SubmitError::Network(_) => FailureKind::Network,
        };

        SubmissionFailure {
            message: err.user_message(),
            kind,
            can_retry: err.is_retryable(),
        }
    }
}
