use super::config::{FailurePolicy, PipelineConfig};
use super::phase_trait::AgentPhase;
use super::phases::{AnalyzerPhase, GeneratorPhase, PlannerPhase, VerifierPhase};
use super::state::{PipelineState, PipelineStep};
use crate::external::DocumentSearch;
use crate::llm::LLMClient;
use crate::progress::{ProgressEvent, ProgressHandler, ProgressUpdate, RunStatus};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline aborted in {phase}: {message}")]
    Aborted { phase: String, message: String },
}

/// Runs the agent phases in order over a fresh state per run.
///
/// The orchestrator holds no per-run data, so one instance serves any number
/// of concurrent sessions.
pub struct PipelineOrchestrator {
    phases: Vec<Box<dyn AgentPhase>>,
    failure_policy: FailurePolicy,
    progress_handler: Arc<dyn ProgressHandler>,
}

impl PipelineOrchestrator {
    pub fn new(
        phases: Vec<Box<dyn AgentPhase>>,
        failure_policy: FailurePolicy,
        progress_handler: Arc<dyn ProgressHandler>,
    ) -> Self {
        Self {
            phases,
            failure_policy,
            progress_handler,
        }
    }

    /// Planner, Analyzer, Generator, Verifier
    pub fn standard(
        llm_client: Arc<dyn LLMClient>,
        search: Arc<dyn DocumentSearch>,
        config: &PipelineConfig,
        progress_handler: Arc<dyn ProgressHandler>,
    ) -> Self {
        let phases: Vec<Box<dyn AgentPhase>> = vec![
            Box::new(PlannerPhase::new(llm_client.clone(), config.clone())),
            Box::new(AnalyzerPhase::new(config.scan.clone())),
            Box::new(GeneratorPhase::new(search)),
            Box::new(VerifierPhase::new(llm_client, config.clone())),
        ];
        Self::new(phases, config.failure_policy, progress_handler)
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub async fn run(
        &self,
        session_id: &str,
        repo_url: &str,
        repo_path: &Path,
    ) -> Result<PipelineState, PipelineError> {
        let start = Instant::now();
        let mut state = PipelineState::new(repo_url, repo_path);

        info!(session_id, repo = %repo_url, "Starting pipeline");
        self.emit(ProgressEvent::Started {
            session_id: session_id.to_string(),
            repo_url: repo_url.to_string(),
        });

        for phase in &self.phases {
            let phase_name = phase.name();
            state.enter(phase.step());
            self.emit(ProgressEvent::PhaseStarted {
                session_id: session_id.to_string(),
                phase: phase_name.to_string(),
            });

            let phase_start = Instant::now();
            let outcome = phase.execute(&state).await;
            let success = outcome.is_ok();

            match outcome {
                Ok(contribution) => state.apply(phase_name, contribution),
                Err(err) => {
                    let message = format!("{:#}", err);
                    warn!(session_id, phase = phase_name, error = %message, "Phase failed");

                    if self.failure_policy == FailurePolicy::AbortOnError {
                        self.emit(ProgressEvent::PhaseComplete {
                            session_id: session_id.to_string(),
                            phase: phase_name.to_string(),
                            duration: phase_start.elapsed(),
                            success,
                        });
                        state.record_error(format!("{}: {}", phase_name, message));
                        self.emit(ProgressEvent::Update(ProgressUpdate::from_state(
                            session_id,
                            &state,
                            RunStatus::Failed,
                        )));
                        self.emit(ProgressEvent::Failed {
                            session_id: session_id.to_string(),
                            error: message.clone(),
                        });
                        return Err(PipelineError::Aborted {
                            phase: phase_name.to_string(),
                            message,
                        });
                    }

                    state.record_error(format!("{}: {}", phase_name, message));
                }
            }

            state.complete(phase.step());
            self.emit(ProgressEvent::PhaseComplete {
                session_id: session_id.to_string(),
                phase: phase_name.to_string(),
                duration: phase_start.elapsed(),
                success,
            });
            self.emit(ProgressEvent::Update(ProgressUpdate::from_state(
                session_id,
                &state,
                RunStatus::InProgress,
            )));
            debug!(session_id, phase = phase_name, progress = state.progress(), "Phase merged");
        }

        state.complete(PipelineStep::Done);
        self.emit(ProgressEvent::Update(ProgressUpdate::from_state(
            session_id,
            &state,
            RunStatus::Completed,
        )));
        self.emit(ProgressEvent::Completed {
            session_id: session_id.to_string(),
            total_time: start.elapsed(),
            errors: state.errors().len(),
        });

        info!(
            session_id,
            files = state.generated_files().len(),
            errors = state.errors().len(),
            "Pipeline complete"
        );
        Ok(state)
    }

    fn emit(&self, event: ProgressEvent) {
        self.progress_handler.on_progress(&event);
    }
}
