use super::llm_helper;
use crate::llm::LLMClient;
use crate::pipeline::{
    AgentPhase, DeploymentPlan, PhaseContribution, PipelineConfig, PipelineState, PipelineStep,
    PlanSource,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub const PLAN_FILE: &str = "deployment-plan.md";

const SYSTEM_PROMPT: &str = "You are a deployment planner. Given a source repository, \
outline the steps needed to containerize it and ship it through CI. Reply in Markdown \
with a short numbered list. Do not invent facts about the code.";

/// Drafts the deployment plan. An unavailable model degrades to a fixed plan.
pub struct PlannerPhase {
    llm_client: Arc<dyn LLMClient>,
    config: PipelineConfig,
}

impl PlannerPhase {
    pub fn new(llm_client: Arc<dyn LLMClient>, config: PipelineConfig) -> Self {
        Self { llm_client, config }
    }

    fn default_plan(repo_url: &str) -> String {
        format!(
            "# Deployment plan\n\n\
             Repository: {}\n\n\
             1. Scan the repository layout and detect the technology stack.\n\
             2. Profile the codebase for tests, documentation and existing CI.\n\
             3. Generate a container build file, a CI workflow and an environment template.\n\
             4. Verify the generated artifacts before handing them over.\n",
            repo_url
        )
    }
}

#[async_trait]
impl AgentPhase for PlannerPhase {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn step(&self) -> PipelineStep {
        PipelineStep::Planning
    }

    async fn execute(&self, state: &PipelineState) -> Result<PhaseContribution> {
        let prompt = format!(
            "Repository URL: {}\nPlan the analysis and deployment artifact generation for it.",
            state.repo_url()
        );

        let (plan, message) = match llm_helper::ask(
            self.llm_client.as_ref(),
            &self.config,
            self.name(),
            SYSTEM_PROMPT,
            prompt,
        )
        .await
        {
            Ok(content) => (
                DeploymentPlan {
                    source: PlanSource::Llm,
                    content,
                },
                "Drafted deployment plan".to_string(),
            ),
            Err(err) => {
                warn!(error = %format!("{:#}", err), "Planner falling back to default plan");
                (
                    DeploymentPlan {
                        source: PlanSource::Default,
                        content: Self::default_plan(state.repo_url()),
                    },
                    "Model unavailable, using default deployment plan".to_string(),
                )
            }
        };

        let file = plan.content.clone();
        Ok(PhaseContribution {
            plan: Some(plan),
            ..PhaseContribution::default()
        }
        .with_message(message)
        .with_file(PLAN_FILE, file))
    }
}
