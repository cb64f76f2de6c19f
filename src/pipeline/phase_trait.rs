use super::state::{PhaseContribution, PipelineState, PipelineStep};
use anyhow::Result;
use async_trait::async_trait;

/// One agent in the pipeline.
///
/// A phase reads the snapshot left by its predecessors and returns what it
/// adds. It cannot change earlier findings.
#[async_trait]
pub trait AgentPhase: Send + Sync {
    /// Agent name recorded on messages and errors
    fn name(&self) -> &'static str;

    fn step(&self) -> PipelineStep;

    async fn execute(&self, state: &PipelineState) -> Result<PhaseContribution>;
}
