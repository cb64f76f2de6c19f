//! Four-agent analysis pipeline
//!
//! Planner, Analyzer, Generator and Verifier run strictly in that order over
//! one [`PipelineState`] per run. See [`orchestrator`] for the step machine
//! and [`state`] for the merge rules.

pub mod config;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod state;

pub use config::{FailurePolicy, PipelineConfig};
pub use orchestrator::{PipelineError, PipelineOrchestrator};
pub use phase_trait::AgentPhase;
pub use state::{
    AgentMessage, DeploymentPlan, PhaseContribution, PipelineState, PipelineStep, PlanSource,
    VerificationCheck, VerificationReport,
};
