//! Session state for the research surface.
//!
//! Everything the webview renders lives in one `ResearchSession` record,
//! and the record changes only through [`reduce`], so every transition is
//! testable without a running app. Tauri manages one [`AppState`] wrapping
//! the session in a mutex; commands lock it only to apply events and take
//! snapshots, never across an await.

use parking_lot::Mutex;

use chrono::Utc;

use crate::research::client::WebhookClient;
use crate::research::ids::EntryIdGen;
use crate::research::normalizer::NormalizedBatch;
use crate::types::{
    Debrief, ResearchEntry, SessionSnapshot, SubmissionRecord, View,
};

/// Maximum number of submission records to keep in memory
const MAX_HISTORY_SIZE: usize = 50;

/// UI-visible state, plus the capped submission history.
#[derive(Debug, Default)]
pub struct ResearchSession {
    pub active_view: View,
    pub entries: Vec<ResearchEntry>,
    pub debrief: Option<Debrief>,
    pub is_submitting: bool,
    pub last_error: Option<String>,
    pub history: Vec<SubmissionRecord>,
}

impl ResearchSession {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active_view: self.active_view,
            entries: self.entries.clone(),
            debrief: self.debrief.clone(),
            is_submitting: self.is_submitting,
            last_error: self.last_error.clone(),
        }
    }

    /// Record a submission attempt, newest first, capped.
    pub fn push_record(&mut self, record: SubmissionRecord) {
        self.history.insert(0, record);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.truncate(MAX_HISTORY_SIZE);
        }
    }
}

/// State transitions. Submission events are the only way entries and the
/// debrief change; both settlement events clear the busy flag.
#[derive(Debug)]
pub enum SessionEvent {
    SubmissionStarted,
    SubmissionSucceeded(NormalizedBatch),
    SubmissionFailed(String),
    ViewChanged(View),
    Cleared,
}

/// Apply one event to the session.
pub fn reduce(session: &mut ResearchSession, event: SessionEvent) {
    match event {
        SessionEvent::SubmissionStarted => {
            session.is_submitting = true;
            session.last_error = None;
        }
        SessionEvent::SubmissionSucceeded(batch) => {
            // Newest batch goes to the front, batch order preserved. The
            // debrief always describes the most recent submission, so a
            // batch without one clears whatever was showing.
            session.entries.splice(0..0, batch.entries);
            session.debrief = batch.debrief;
            session.is_submitting = false;
            session.last_error = None;
            session.active_view = View::Results;
        }
        SessionEvent::SubmissionFailed(message) => {
            session.is_submitting = false;
            session.last_error = Some(message);
        }
        SessionEvent::ViewChanged(view) => {
            session.active_view = view;
        }
        SessionEvent::Cleared => {
            session.entries.clear();
            session.debrief = None;
        }
    }
}

/// Application state managed by Tauri
pub struct AppState {
    pub session: Mutex<ResearchSession>,
    pub webhook: WebhookClient,
    pub entry_ids: EntryIdGen,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(ResearchSession::default()),
            webhook: WebhookClient::from_env(),
            entry_ids: EntryIdGen::new(),
        }
    }

    /// Run `f` against the locked session.
    pub fn with_session<T>(&self, f: impl FnOnce(&mut ResearchSession) -> T) -> T {
        let mut guard = self.session.lock();
        f(&mut guard)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a new submission record
pub fn create_submission_record(company_name: &str) -> SubmissionRecord {
    SubmissionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        company_name: company_name.to_string(),
        started_at: Utc::now(),
        duration_ms: None,
        success: false,
        error_message: None,
        entry_count: 0,
    }
}
