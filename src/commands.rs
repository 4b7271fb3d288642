//! Tauri IPC commands, the complete surface the webview invokes.

use std::sync::Arc;
use std::time::Instant;

use tauri::State;

use crate::error::SubmissionFailure;
use crate::research::normalizer::normalize;
use crate::state::{create_submission_record, reduce, AppState, SessionEvent};
use crate::types::{
    ResearchRequest, SessionSnapshot, SubmissionOutcome, SubmissionRecord, View,
};

/// Submit the research form.
///
/// At most one submission may be in flight: a second call while busy is
/// rejected without touching the network. The busy flag is cleared on every
/// settlement path through the reducer.
#[tauri::command]
pub async fn submit_research(
    payload: ResearchRequest,
    state: State<'_, Arc<AppState>>,
) -> Result<SubmissionOutcome, SubmissionFailure> {
    let started = Instant::now();

    // In-flight guard and busy transition under one lock.
    let already_busy = state.with_session(|session| {
        if session.is_submitting {
            true
        } else {
            reduce(session, SessionEvent::SubmissionStarted);
            false
        }
    });
    if already_busy {
        return Err(SubmissionFailure::busy());
    }

    let mut record = create_submission_record(payload.company_name.trim());

    let result = state.webhook.submit(&payload).await;
    record.duration_ms = Some(started.elapsed().as_millis() as u64);

    let outcome = match result {
        Ok(body) => {
            let batch = normalize(payload.company_name.trim(), &body, &state.entry_ids);
            let entry_count = batch.entries.len() as u32;
            let has_debrief = batch.debrief.is_some();

            record.success = true;
            record.entry_count = entry_count;

            let session = state.with_session(|session| {
                reduce(session, SessionEvent::SubmissionSucceeded(batch));
                session.push_record(record);
                session.snapshot()
            });

            Ok(SubmissionOutcome {
                entry_count,
                has_debrief,
                session,
            })
        }
        Err(err) => {
            let failure = SubmissionFailure::from(&err);
            record.error_message = Some(failure.message.clone());

            state.with_session(|session| {
                reduce(session, SessionEvent::SubmissionFailed(failure.message.clone()));
                session.push_record(record);
            });

            Err(failure)
        }
    };

    log::debug!(
        "submit_research settled in {}ms",
        started.elapsed().as_millis()
    );

    outcome
}

/// Current session snapshot for the webview.
#[tauri::command]
pub fn get_session(state: State<'_, Arc<AppState>>) -> SessionSnapshot {
    state.with_session(|session| session.snapshot())
}

/// Clear all accumulated entries and the debrief.
#[tauri::command]
pub fn clear_results(state: State<'_, Arc<AppState>>) -> SessionSnapshot {
    state.with_session(|session| {
        reduce(session, SessionEvent::Cleared);
        session.snapshot()
    })
}

/// Switch between the form and results tabs.
#[tauri::command]
pub fn set_active_view(view: View, state: State<'_, Arc<AppState>>) -> SessionSnapshot {
    state.with_session(|session| {
        reduce(session, SessionEvent::ViewChanged(view));
        session.snapshot()
    })
}

/// Recent submission attempts, newest first.
#[tauri::command]
pub fn get_submission_history(state: State<'_, Arc<AppState>>) -> Vec<SubmissionRecord> {
    state.with_session(|session| session.history.clone())
}
