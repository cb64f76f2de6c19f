use crate::external::{fallback_references, DocumentSearch, SearchResult};
use crate::generate::generate;
use crate::pipeline::{AgentPhase, PhaseContribution, PipelineState, PipelineStep};
use crate::profile::CodebaseAnalysis;
use crate::scan::ProjectStructure;
use crate::stack::TechStackProfile;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_REFERENCES: usize = 3;

/// Renders the deployment artifacts from the analyzer's findings
pub struct GeneratorPhase {
    search: Arc<dyn DocumentSearch>,
}

impl GeneratorPhase {
    pub fn new(search: Arc<dyn DocumentSearch>) -> Self {
        Self { search }
    }

    async fn references(&self, stack: &TechStackProfile) -> Vec<SearchResult> {
        let query = format!("{} Dockerfile deployment best practices", stack.primary);
        match self.search.search(&query, MAX_REFERENCES).await {
            Ok(results) if !results.is_empty() => results,
            Ok(_) => {
                debug!(query = %query, "Search returned nothing, using static references");
                fallback_references(stack.primary)
            }
            Err(err) => {
                warn!(error = %format!("{:#}", err), "Document search unavailable, using static references");
                fallback_references(stack.primary)
            }
        }
    }
}

#[async_trait]
impl AgentPhase for GeneratorPhase {
    fn name(&self) -> &'static str {
        "generator"
    }

    fn step(&self) -> PipelineStep {
        PipelineStep::Generating
    }

    async fn execute(&self, state: &PipelineState) -> Result<PhaseContribution> {
        let mut contribution = PhaseContribution::new();

        let stack = match state.tech_stack() {
            Some(stack) => stack.clone(),
            None => {
                contribution = contribution
                    .with_message("No tech stack available, generating generic templates");
                TechStackProfile::unknown()
            }
        };
        let structure = state.project_structure().cloned().unwrap_or_else(ProjectStructure::new);
        let analysis = state.codebase_analysis().cloned().unwrap_or_else(CodebaseAnalysis::default);

        let references = self.references(&stack).await;
        let titles: Vec<&str> = references
            .iter()
            .take(MAX_REFERENCES)
            .map(|r| r.title.as_str())
            .collect();

        let artifacts = generate(&stack, &structure, &analysis)?;
        let names: Vec<&str> = artifacts.named().iter().map(|(name, _)| *name).collect();

        contribution = contribution
            .with_message(format!("Consulted references: {}", titles.join("; ")))
            .with_message(format!("Generated {}", names.join(", ")));
        for (name, content) in artifacts.named() {
            contribution = contribution.with_file(name, content);
        }
        Ok(contribution)
    }
}
