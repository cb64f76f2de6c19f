//! Progress handler trait and events

use crate::pipeline::{AgentMessage, PipelineState, PipelineStep};
use crate::stack::TechStackProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

/// Snapshot pushed to listeners after every phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub session_id: String,
    pub step: PipelineStep,
    pub progress: u8,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<AgentMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<TechStackProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_files: Option<Vec<String>>,
}

impl ProgressUpdate {
    pub fn from_state(session_id: &str, state: &PipelineState, status: RunStatus) -> Self {
        let generated_files = if state.generated_files().is_empty() {
            None
        } else {
            Some(state.generated_files().keys().cloned().collect())
        };

        Self {
            session_id: session_id.to_string(),
            step: state.current_step(),
            progress: state.progress(),
            status,
            messages: state.messages().to_vec(),
            errors: state.errors().to_vec(),
            tech_stack: state.tech_stack().cloned(),
            generated_files,
        }
    }
}

/// Events emitted while a session's pipeline runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { session_id: String, repo_url: String },

    PhaseStarted { session_id: String, phase: String },

    PhaseComplete {
        session_id: String,
        phase: String,
        duration: Duration,
        success: bool,
    },

    /// Cumulative state after a phase or at the end of the run
    Update(ProgressUpdate),

    Completed {
        session_id: String,
        total_time: Duration,
        errors: usize,
    },

    Failed { session_id: String, error: String },
}

impl ProgressEvent {
    pub fn session_id(&self) -> &str {
        match self {
            ProgressEvent::Started { session_id, .. }
            | ProgressEvent::PhaseStarted { session_id, .. }
            | ProgressEvent::PhaseComplete { session_id, .. }
            | ProgressEvent::Completed { session_id, .. }
            | ProgressEvent::Failed { session_id, .. } => session_id,
            ProgressEvent::Update(update) => &update.session_id,
        }
    }
}

/// Receives progress events.
///
/// Implementations must return quickly and never panic: the orchestrator
/// calls them inline between phases.
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Forwards every event to each inner handler in order
#[derive(Default, Clone)]
pub struct CompositeHandler {
    handlers: Vec<Arc<dyn ProgressHandler>>,
}

impl CompositeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl ProgressHandler for CompositeHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        for handler in &self.handlers {
            handler.on_progress(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn started() -> ProgressEvent {
        ProgressEvent::Started {
            session_id: "s-1".to_string(),
            repo_url: "https://github.com/acme/web".to_string(),
        }
    }

    #[test]
    fn test_noop_handler() {
        NoOpHandler.on_progress(&started());
    }

    #[test]
    fn test_composite_fans_out() {
        let count = Arc::new(AtomicUsize::new(0));
        let composite = CompositeHandler::new()
            .with(Arc::new(CountingHandler {
                count: count.clone(),
            }))
            .with(Arc::new(CountingHandler {
                count: count.clone(),
            }));

        composite.on_progress(&started());
        composite.on_progress(&ProgressEvent::Failed {
            session_id: "s-1".to_string(),
            error: "boom".to_string(),
        });

        assert_eq!(composite.len(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_update_from_state() {
        let state = PipelineState::new("https://github.com/acme/web", "/tmp/web");
        let update = ProgressUpdate::from_state("s-1", &state, RunStatus::InProgress);

        assert_eq!(update.progress, 0);
        assert!(update.generated_files.is_none());
        assert_eq!(ProgressEvent::Update(update).session_id(), "s-1");
    }

    #[test]
    fn test_update_serialization_skips_empty_fields() {
        let state = PipelineState::new("https://github.com/acme/web", "/tmp/web");
        let update = ProgressUpdate::from_state("s-1", &state, RunStatus::InProgress);
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["step"], "initialized");
        assert!(json.get("messages").is_none());
        assert!(json.get("tech_stack").is_none());
    }
}
