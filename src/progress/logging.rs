//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler, RunStatus};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                session_id,
                repo_url,
            } => {
                info!(session_id = %session_id, repo = %repo_url, "Starting analysis");
            }
            ProgressEvent::PhaseStarted { session_id, phase } => {
                info!(session_id = %session_id, phase = %phase, "Starting phase");
            }
            ProgressEvent::PhaseComplete {
                session_id,
                phase,
                duration,
                success,
            } => {
                if *success {
                    info!(
                        session_id = %session_id,
                        phase = %phase,
                        duration_ms = duration.as_millis(),
                        "Phase complete"
                    );
                } else {
                    warn!(
                        session_id = %session_id,
                        phase = %phase,
                        duration_ms = duration.as_millis(),
                        "Phase failed"
                    );
                }
            }
            ProgressEvent::Update(update) => {
                debug!(
                    session_id = %update.session_id,
                    step = %update.step,
                    progress = update.progress,
                    messages = update.messages.len(),
                    errors = update.errors.len(),
                    final_update = update.status != RunStatus::InProgress,
                    "Progress update"
                );
            }
            ProgressEvent::Completed {
                session_id,
                total_time,
                errors,
            } => {
                if *errors > 0 {
                    warn!(
                        session_id = %session_id,
                        errors,
                        total_time_ms = total_time.as_millis(),
                        "Analysis complete with errors"
                    );
                } else {
                    info!(
                        session_id = %session_id,
                        total_time_ms = total_time.as_millis(),
                        "Analysis complete"
                    );
                }
            }
            ProgressEvent::Failed { session_id, error } => {
                warn!(session_id = %session_id, error = %error, "Analysis failed");
            }
        }
    }
}
