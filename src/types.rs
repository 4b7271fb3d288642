//! Shared types for the research form and results surface.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// Sentinel URL meaning "this entry has no link".
pub const NO_LINK: &str = "#";

/// Category assigned to entries that arrive without one.
pub const DEFAULT_CATEGORY: &str = "Research";

/// Form payload submitted to the research webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub company_name: String,
    pub company_website: String,
}

impl ResearchRequest {
    /// Both fields must be non-blank after trimming. Checked before any
    /// network call is made.
    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.company_name.trim().is_empty() {
            return Err(SubmitError::Validation(
                "Company name is required".to_string(),
            ));
        }
        if self.company_website.trim().is_empty() {
            return Err(SubmitError::Validation(
                "Company website is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One normalized source/article card in the results view.
///
/// Immutable once created. The session prepends whole batches and only ever
/// removes entries through the clear-all reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchEntry {
    pub id: String,
    pub company_name: String,
    pub category: String,
    pub title: String,
    pub summary: String,
    /// "#" means no link.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
}

/// Synthesized narrative summary, distinct from the per-source entries.
///
/// At most one is live at a time and it always describes the most recent
/// submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debrief {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_body: Option<String>,
    #[serde(default)]
    pub bullet_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<HashMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet_point_count: Option<u64>,
}

/// Which tab the webview is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Form,
    Results,
}

/// One submission attempt, kept in a capped in-memory history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub company_name: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub entry_count: u32,
}

/// Snapshot of the session the webview renders from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub active_view: View,
    pub entries: Vec<ResearchEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debrief: Option<Debrief>,
    pub is_submitting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Returned by a successful submission: what the batch contained, plus the
/// refreshed snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub entry_count: u32,
    pub has_debrief: bool,
    pub session: SessionSnapshot,
}
