//! Accumulated pipeline record and the typed contributions that grow it
//!
//! Phases never see a mutable [`PipelineState`]. Each receives a shared
//! reference and returns a [`PhaseContribution`]; the orchestrator merges it
//! with [`PipelineState::apply`], which is the only mutation path. Merging
//! enforces the additive model:
//!
//! - single-valued findings are set once; a second write is rejected and
//!   recorded as an error
//! - generated files are keyed by name and never replaced
//! - messages and errors only grow
//! - progress never decreases

use crate::profile::CodebaseAnalysis;
use crate::scan::ProjectStructure;
use crate::stack::TechStackProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Initialized,
    Planning,
    Analyzing,
    Generating,
    Verifying,
    Done,
}

impl PipelineStep {
    /// Progress reached once this step has finished
    pub fn checkpoint(&self) -> u8 {
        match self {
            PipelineStep::Initialized => 0,
            PipelineStep::Planning => 20,
            PipelineStep::Analyzing => 50,
            PipelineStep::Generating => 80,
            PipelineStep::Verifying => 95,
            PipelineStep::Done => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Initialized => "initialized",
            PipelineStep::Planning => "planning",
            PipelineStep::Analyzing => "analyzing",
            PipelineStep::Generating => "generating",
            PipelineStep::Verifying => "verifying",
            PipelineStep::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Llm,
    Default,
}

/// Planner output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub source: PlanSource,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Verifier output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub passed: bool,
    pub low_confidence: bool,
    pub checks: Vec<VerificationCheck>,
    pub review: Option<String>,
}

impl VerificationReport {
    pub fn failed_checks(&self) -> impl Iterator<Item = &VerificationCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// What one phase adds to the state
#[derive(Debug, Clone, Default)]
pub struct PhaseContribution {
    pub plan: Option<DeploymentPlan>,
    pub project_structure: Option<ProjectStructure>,
    pub tech_stack: Option<TechStackProfile>,
    pub codebase_analysis: Option<CodebaseAnalysis>,
    pub verification: Option<VerificationReport>,
    pub generated_files: BTreeMap<String, String>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

impl PhaseContribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.generated_files.insert(name.into(), content.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    repo_url: String,
    repo_path: PathBuf,
    plan: Option<DeploymentPlan>,
    project_structure: Option<ProjectStructure>,
    tech_stack: Option<TechStackProfile>,
    codebase_analysis: Option<CodebaseAnalysis>,
    verification: Option<VerificationReport>,
    generated_files: BTreeMap<String, String>,
    current_step: PipelineStep,
    progress: u8,
    messages: Vec<AgentMessage>,
    errors: Vec<String>,
}

impl PipelineState {
    pub fn new(repo_url: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_url: repo_url.into(),
            repo_path: repo_path.into(),
            plan: None,
            project_structure: None,
            tech_stack: None,
            codebase_analysis: None,
            verification: None,
            generated_files: BTreeMap::new(),
            current_step: PipelineStep::Initialized,
            progress: 0,
            messages: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn plan(&self) -> Option<&DeploymentPlan> {
        self.plan.as_ref()
    }

    pub fn project_structure(&self) -> Option<&ProjectStructure> {
        self.project_structure.as_ref()
    }

    pub fn tech_stack(&self) -> Option<&TechStackProfile> {
        self.tech_stack.as_ref()
    }

    pub fn codebase_analysis(&self) -> Option<&CodebaseAnalysis> {
        self.codebase_analysis.as_ref()
    }

    pub fn verification(&self) -> Option<&VerificationReport> {
        self.verification.as_ref()
    }

    pub fn generated_files(&self) -> &BTreeMap<String, String> {
        &self.generated_files
    }

    pub fn generated_file(&self, name: &str) -> Option<&str> {
        self.generated_files.get(name).map(String::as_str)
    }

    pub fn current_step(&self) -> PipelineStep {
        self.current_step
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn enter(&mut self, step: PipelineStep) {
        if step > self.current_step {
            self.current_step = step;
        }
    }

    /// Marks `step` finished and raises progress to its checkpoint
    pub(crate) fn complete(&mut self, step: PipelineStep) {
        self.enter(step);
        self.progress = self.progress.max(step.checkpoint());
    }

    pub(crate) fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub(crate) fn apply(&mut self, agent: &str, contribution: PhaseContribution) {
        let PhaseContribution {
            plan,
            project_structure,
            tech_stack,
            codebase_analysis,
            verification,
            generated_files,
            messages,
            errors,
        } = contribution;

        let mut rejected = Vec::new();
        set_once(&mut self.plan, plan, "plan", &mut rejected);
        set_once(
            &mut self.project_structure,
            project_structure,
            "project_structure",
            &mut rejected,
        );
        set_once(&mut self.tech_stack, tech_stack, "tech_stack", &mut rejected);
        set_once(
            &mut self.codebase_analysis,
            codebase_analysis,
            "codebase_analysis",
            &mut rejected,
        );
        set_once(&mut self.verification, verification, "verification", &mut rejected);

        for (name, content) in generated_files {
            if self.generated_files.contains_key(&name) {
                rejected.push(format!("generated file '{}'", name));
            } else {
                self.generated_files.insert(name, content);
            }
        }

        let now = Utc::now();
        self.messages
            .extend(messages.into_iter().map(|message| AgentMessage {
                agent: agent.to_string(),
                message,
                timestamp: now,
            }));
        self.errors
            .extend(errors.into_iter().map(|e| format!("{}: {}", agent, e)));
        self.errors.extend(
            rejected
                .into_iter()
                .map(|field| format!("{}: {} already set, keeping earlier value", agent, field)),
        );
    }
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>, field: &str, rejected: &mut Vec<String>) {
    if let Some(value) = value {
        if slot.is_some() {
            rejected.push(field.to_string());
        } else {
            *slot = Some(value);
        }
    }
}
