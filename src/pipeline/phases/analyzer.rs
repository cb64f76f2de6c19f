use crate::pipeline::{AgentPhase, PhaseContribution, PipelineState, PipelineStep};
use crate::profile::profile;
use crate::scan::{ScanConfig, Scanner};
use crate::stack::classify_with_diagnostics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

/// Scanner, classifier and profiler over the acquired snapshot
pub struct AnalyzerPhase {
    scan_config: ScanConfig,
}

impl AnalyzerPhase {
    pub fn new(scan_config: ScanConfig) -> Self {
        Self { scan_config }
    }
}

#[async_trait]
impl AgentPhase for AnalyzerPhase {
    fn name(&self) -> &'static str {
        "analyzer"
    }

    fn step(&self) -> PipelineStep {
        PipelineStep::Analyzing
    }

    async fn execute(&self, state: &PipelineState) -> Result<PhaseContribution> {
        let root = state.repo_path().to_path_buf();
        let scanner = Scanner::new(self.scan_config.clone());

        let (structure, classification, analysis) = tokio::task::spawn_blocking(move || {
            let structure = scanner.scan(&root)?;
            let classification = classify_with_diagnostics(&root, &structure);
            let analysis = profile(&structure);
            anyhow::Ok((structure, classification, analysis))
        })
        .await
        .context("Analyzer task panicked")?
        .context("Failed to scan repository")?;

        let stack = classification.profile;
        info!(
            platform = %stack.primary,
            confidence = stack.confidence,
            files = analysis.file_count,
            "Repository analyzed"
        );

        let mut contribution = PhaseContribution::new()
            .with_message(format!(
                "Scanned {} files in {} directories",
                analysis.file_count, analysis.directories
            ))
            .with_message(format!(
                "Detected {} stack (confidence {}%)",
                stack.primary, stack.confidence
            ));
        contribution.errors.extend(classification.warnings);
        contribution.project_structure = Some(structure);
        contribution.tech_stack = Some(stack);
        contribution.codebase_analysis = Some(analysis);
        Ok(contribution)
    }
}
