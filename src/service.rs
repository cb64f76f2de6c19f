//! Analysis service
//!
//! [`AnalysisService`] is the single entry point used by the HTTP server and
//! the CLI. It ties the acquirer, the session registry and the pipeline
//! orchestrator together:
//!
//! 1. `clone_repository` validates the URL, registers a session and clones
//! 2. `start_analysis` (background) or `run_analysis` (awaited) runs the
//!    four agents and stores the final state on the session
//! 3. `status`, `results` and `artifact` read the session back
//!
//! Collaborator failures after completion (memory, artifact storage) are
//! logged and never change the session outcome.
//!
//! # Example
//!
//! ```no_run
//! use stackpilot::service::{AnalysisService, CloneRequest};
//! use stackpilot::StackpilotConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StackpilotConfig::default();
//! let service = AnalysisService::from_config(&config)?;
//!
//! let cloned = service
//!     .clone_repository(CloneRequest::new("https://github.com/acme/web"))
//!     .await?;
//! let session = service.run_analysis(&cloned.session_id).await?;
//! println!("{}", session.status());
//! # Ok(())
//! # }
//! ```

use crate::acquire::{AcquireError, Acquirer, GitFetcher, RepositoryFetcher};
use crate::config::StackpilotConfig;
use crate::external::{
    ArtifactStore, DocumentSearch, InMemoryArtifactStore, Interaction, MemoryStore, NoopMemory,
    NoopSearch,
};
use crate::llm::LLMClient;
use crate::pipeline::{
    AgentMessage, DeploymentPlan, PipelineConfig, PipelineError, PipelineOrchestrator,
    PipelineState, VerificationReport,
};
use crate::profile::CodebaseAnalysis;
use crate::progress::{CompositeHandler, EventBus, LoggingHandler, ProgressHandler, UpdateReceiver};
use crate::session::{
    remove_scratch, RegistryError, Session, SessionRegistry, SessionStatus, SessionTransition,
};
use crate::stack::TechStackProfile;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Wire-level error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidUrl,
    CloneFailed,
    InvalidSession,
    NotFound,
    NotReady,
    AnalysisFailed,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("Clone failed: {0}")]
    CloneFailed(String),

    /// Analysis requested for a session that does not exist
    #[error("Unknown session: {0}")]
    InvalidSession(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session {id} is {status}")]
    NotReady { id: String, status: SessionStatus },

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ServiceError::CloneFailed(_) => ErrorKind::CloneFailed,
            ServiceError::InvalidSession(_) => ErrorKind::InvalidSession,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::NotReady { .. } => ErrorKind::NotReady,
            ServiceError::AnalysisFailed(_) => ErrorKind::AnalysisFailed,
            ServiceError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns a user-friendly error message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            ServiceError::InvalidUrl(reason) => format!(
                "Error: Invalid repository URL\n\n\
                 Help: Use the form https://github.com/<owner>/<name>.\n\
                 Set STACKPILOT_ALLOWED_HOST to accept another host.\n\n\
                 Details: {}",
                reason
            ),
            ServiceError::CloneFailed(message) => format!(
                "Error: Could not clone the repository\n\n\
                 Help: Check that:\n\
                 - the repository exists and the URL is spelled correctly\n\
                 - private repositories are given a token with --token\n\
                 - the network can reach the host\n\n\
                 Details: {}",
                message
            ),
            ServiceError::Infrastructure(message) => format!(
                "Error: Local storage problem\n\n\
                 Help: Check free disk space and permissions on STACKPILOT_SCRATCH_DIR.\n\n\
                 Details: {}",
                message
            ),
            other => format!("Error: {}", other),
        }
    }
}

impl From<AcquireError> for ServiceError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::InvalidUrl { .. } => ServiceError::InvalidUrl(err.to_string()),
            AcquireError::CloneFailed { .. } => ServiceError::CloneFailed(err.to_string()),
            AcquireError::Infrastructure { .. } => ServiceError::Infrastructure(err.to_string()),
        }
    }
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { id } => ServiceError::NotFound(format!("session {}", id)),
            RegistryError::InvalidTransition { id, from, .. } => {
                ServiceError::NotReady { id, status: from }
            }
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CloneRequest {
    pub repo_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CloneRequest {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            auth_token: None,
            user_id: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

impl fmt::Debug for CloneRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneRequest")
            .field("repo_url", &self.repo_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneResponse {
    pub session_id: String,
    pub repo_name: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub repo_url: String,
    pub repo_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Session> for StatusResponse {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            status: session.status(),
            repo_url: session.repo_url().to_string(),
            repo_name: session.repo_name().to_string(),
            created_at: session.created_at(),
            cloned_at: session.cloned_at(),
            analysis_started_at: session.analysis_started_at(),
            completed_at: session.completed_at(),
            error: session.error_message().map(str::to_string),
        }
    }
}

/// Compact outcome of a finished analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub tech_stack: TechStackProfile,
    pub codebase_analysis: CodebaseAnalysis,
    pub generated_files: Vec<String>,
    pub messages: Vec<AgentMessage>,
    pub errors: Vec<String>,
}

impl From<&PipelineState> for AnalysisSummary {
    fn from(state: &PipelineState) -> Self {
        Self {
            tech_stack: state.tech_stack().cloned().unwrap_or_default(),
            codebase_analysis: state.codebase_analysis().cloned().unwrap_or_default(),
            generated_files: state.generated_files().keys().cloned().collect(),
            messages: state.messages().to_vec(),
            errors: state.errors().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsMetadata {
    pub repo_url: String,
    pub repo_name: String,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Everything a completed session produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub files: BTreeMap<String, String>,
    pub tech_stack: TechStackProfile,
    pub codebase_analysis: CodebaseAnalysis,
    pub verification_results: Option<VerificationReport>,
    pub plan: Option<DeploymentPlan>,
    pub messages: Vec<AgentMessage>,
    pub errors: Vec<String>,
    pub metadata: ResultsMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub content_type: &'static str,
    pub content: String,
}

pub fn content_type_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.ends_with(".yml") || lower.ends_with(".yaml") {
        "application/x-yaml"
    } else if lower.ends_with(".json") {
        "application/json"
    } else if lower.ends_with(".md") {
        "text/markdown; charset=utf-8"
    } else {
        "text/plain; charset=utf-8"
    }
}

pub struct AnalysisServiceBuilder {
    acquirer: Acquirer,
    llm_client: Arc<dyn LLMClient>,
    pipeline_config: PipelineConfig,
    registry: Option<Arc<SessionRegistry>>,
    search: Arc<dyn DocumentSearch>,
    memory: Arc<dyn MemoryStore>,
    artifact_store: Arc<dyn ArtifactStore>,
    events: EventBus,
    extra_handler: Option<Arc<dyn ProgressHandler>>,
}

impl AnalysisServiceBuilder {
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    pub fn registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn search(mut self, search: Arc<dyn DocumentSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = memory;
        self
    }

    pub fn artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifact_store = store;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Extra listener notified alongside logging and the event bus
    pub fn progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.extra_handler = Some(handler);
        self
    }

    pub fn build(self) -> Arc<AnalysisService> {
        let mut handler = CompositeHandler::new()
            .with(Arc::new(LoggingHandler))
            .with(Arc::new(self.events.clone()));
        if let Some(extra) = self.extra_handler {
            handler = handler.with(extra);
        }

        let orchestrator = PipelineOrchestrator::standard(
            self.llm_client,
            self.search,
            &self.pipeline_config,
            Arc::new(handler),
        );

        Arc::new(AnalysisService {
            registry: self.registry.unwrap_or_default(),
            acquirer: self.acquirer,
            orchestrator,
            events: self.events,
            memory: self.memory,
            artifact_store: self.artifact_store,
        })
    }
}

pub struct AnalysisService {
    registry: Arc<SessionRegistry>,
    acquirer: Acquirer,
    orchestrator: PipelineOrchestrator,
    events: EventBus,
    memory: Arc<dyn MemoryStore>,
    artifact_store: Arc<dyn ArtifactStore>,
}

impl AnalysisService {
    pub fn builder(acquirer: Acquirer, llm_client: Arc<dyn LLMClient>) -> AnalysisServiceBuilder {
        AnalysisServiceBuilder {
            acquirer,
            llm_client,
            pipeline_config: PipelineConfig::default(),
            registry: None,
            search: Arc::new(NoopSearch),
            memory: Arc::new(NoopMemory),
            artifact_store: Arc::new(InMemoryArtifactStore::default()),
            events: EventBus::default(),
            extra_handler: None,
        }
    }

    /// Production wiring: git clones and the configured LLM provider
    pub fn from_config(config: &StackpilotConfig) -> Result<Arc<Self>, ServiceError> {
        config
            .validate()
            .map_err(|e| ServiceError::Infrastructure(e.to_string()))?;

        let fetcher: Arc<dyn RepositoryFetcher> = Arc::new(GitFetcher::new());
        let acquirer = Acquirer::new(
            config.scratch_dir.clone(),
            config.allowed_host.clone(),
            fetcher,
        );

        Ok(Self::builder(acquirer, config.create_llm_client())
            .pipeline_config(config.pipeline_config())
            .build())
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    pub async fn clone_repository(
        &self,
        request: CloneRequest,
    ) -> Result<CloneResponse, ServiceError> {
        let url = self.acquirer.validate(&request.repo_url)?;

        let session_id = self
            .registry
            .create_for_user(
                request.user_id.clone(),
                url.to_string(),
                url.repo_name(),
                self.acquirer.scratch_root(),
            )
            .await;

        match self
            .acquirer
            .acquire(&session_id, &url, request.auth_token.as_deref())
            .await
        {
            Ok(snapshot) => {
                self.registry
                    .update(
                        &session_id,
                        SessionTransition::Cloned {
                            local_path: snapshot.local_path.clone(),
                        },
                    )
                    .await?;
                Ok(CloneResponse {
                    session_id,
                    repo_name: snapshot.repo_name,
                    local_path: snapshot.local_path,
                })
            }
            Err(err) => {
                let err = ServiceError::from(err);
                warn!(session_id = %session_id, error = %err, "Clone failed");
                self.registry
                    .update(
                        &session_id,
                        SessionTransition::Failed {
                            error: err.to_string(),
                        },
                    )
                    .await?;
                Err(err)
            }
        }
    }

    /// Moves a cloned session to `analyzing`; rejects unknown or busy sessions
    async fn begin_analysis(&self, session_id: &str) -> Result<Session, ServiceError> {
        let session = self
            .registry
            .get(session_id)
            .await
            .map_err(|_| ServiceError::InvalidSession(session_id.to_string()))?;

        if session.status() != SessionStatus::Cloned {
            return Err(ServiceError::NotReady {
                id: session_id.to_string(),
                status: session.status(),
            });
        }

        Ok(self
            .registry
            .update(session_id, SessionTransition::AnalysisStarted)
            .await?)
    }

    /// Accepts the session for analysis and runs the pipeline in the background
    pub async fn start_analysis(self: &Arc<Self>, session_id: &str) -> Result<(), ServiceError> {
        let session = self.begin_analysis(session_id).await?;

        let service = Arc::clone(self);
        let session_id = session.id().to_string();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(service.execute(session)).catch_unwind().await;
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    error!(session_id = %session_id, error = %err, "Background analysis ended with an error");
                }
                Err(payload) => {
                    let message = format!("analysis panicked: {}", panic_message(payload.as_ref()));
                    error!(session_id = %session_id, "{}", message);
                    match service.fail(&session_id, message).await {
                        Err(ServiceError::AnalysisFailed(_)) | Ok(_) => {}
                        Err(err) => {
                            warn!(session_id = %session_id, error = %err, "Could not mark panicked session failed");
                        }
                    }
                }
            }
        });
        Ok(())
    }

    /// Runs the pipeline to completion and returns the terminal session
    pub async fn run_analysis(&self, session_id: &str) -> Result<Session, ServiceError> {
        let session = self.begin_analysis(session_id).await?;
        self.execute(session).await
    }

    async fn execute(&self, session: Session) -> Result<Session, ServiceError> {
        let session_id = session.id().to_string();
        let Some(local_path) = session.local_path().map(PathBuf::from) else {
            return self
                .fail(&session_id, "session has no local checkout".to_string())
                .await;
        };

        match self
            .orchestrator
            .run(&session_id, session.repo_url(), &local_path)
            .await
        {
            Ok(state) => {
                let completed = self
                    .registry
                    .update(
                        &session_id,
                        SessionTransition::Completed {
                            result: Box::new(state),
                        },
                    )
                    .await?;
                self.after_completion(&completed).await;
                Ok(completed)
            }
            Err(PipelineError::Aborted { phase, message }) => {
                self.fail(&session_id, format!("{} failed: {}", phase, message))
                    .await
            }
        }
    }

    async fn fail(&self, session_id: &str, message: String) -> Result<Session, ServiceError> {
        self.registry
            .update(
                session_id,
                SessionTransition::Failed {
                    error: message.clone(),
                },
            )
            .await?;
        Err(ServiceError::AnalysisFailed(message))
    }

    async fn after_completion(&self, session: &Session) {
        let Some(state) = session.analysis_result() else {
            return;
        };

        let summary = state
            .tech_stack()
            .map(|s| format!("{} stack, confidence {}%", s.primary, s.confidence))
            .unwrap_or_else(|| "no stack detected".to_string());
        let interaction = Interaction {
            user_id: session.user_id().unwrap_or("anonymous").to_string(),
            session_id: session.id().to_string(),
            repo_url: session.repo_url().to_string(),
            summary,
            timestamp: Utc::now(),
        };
        if let Err(err) = self.memory.record(interaction).await {
            warn!(session_id = %session.id(), error = %format!("{:#}", err), "Skipping memory write");
        }

        for (name, content) in state.generated_files() {
            let stored = self
                .artifact_store
                .put(name, content.clone().into_bytes())
                .await;
            match stored {
                Ok(file_id) => {
                    info!(session_id = %session.id(), artifact = %name, file_id = %file_id, "Artifact stored")
                }
                Err(err) => {
                    warn!(session_id = %session.id(), artifact = %name, error = %format!("{:#}", err), "Failed to store artifact")
                }
            }
        }
    }

    pub async fn status(&self, session_id: &str) -> Result<StatusResponse, ServiceError> {
        let session = self.registry.get(session_id).await?;
        Ok(StatusResponse::from(&session))
    }

    pub async fn list(&self) -> Vec<StatusResponse> {
        self.registry
            .list_all()
            .await
            .iter()
            .map(StatusResponse::from)
            .collect()
    }

    async fn completed(&self, session_id: &str) -> Result<Session, ServiceError> {
        let session = self.registry.get(session_id).await?;
        if session.status() != SessionStatus::Completed {
            return Err(ServiceError::NotReady {
                id: session_id.to_string(),
                status: session.status(),
            });
        }
        Ok(session)
    }

    pub async fn summary(&self, session_id: &str) -> Result<AnalysisSummary, ServiceError> {
        let session = self.completed(session_id).await?;
        let state = session
            .analysis_result()
            .ok_or_else(|| ServiceError::Infrastructure("completed session without result".into()))?;
        Ok(AnalysisSummary::from(state))
    }

    pub async fn results(&self, session_id: &str) -> Result<ResultsResponse, ServiceError> {
        let session = self.completed(session_id).await?;
        let state = session
            .analysis_result()
            .ok_or_else(|| ServiceError::Infrastructure("completed session without result".into()))?;

        Ok(ResultsResponse {
            files: state.generated_files().clone(),
            tech_stack: state.tech_stack().cloned().unwrap_or_default(),
            codebase_analysis: state.codebase_analysis().cloned().unwrap_or_default(),
            verification_results: state.verification().cloned(),
            plan: state.plan().cloned(),
            messages: state.messages().to_vec(),
            errors: state.errors().to_vec(),
            metadata: ResultsMetadata {
                repo_url: session.repo_url().to_string(),
                repo_name: session.repo_name().to_string(),
                completed_at: session.completed_at(),
            },
        })
    }

    pub async fn artifact(&self, session_id: &str, name: &str) -> Result<Artifact, ServiceError> {
        let session = self.completed(session_id).await?;
        let content = session
            .analysis_result()
            .and_then(|state| state.generated_file(name))
            .ok_or_else(|| ServiceError::NotFound(format!("artifact {}", name)))?;

        Ok(Artifact {
            name: name.to_string(),
            content_type: content_type_for(name),
            content: content.to_string(),
        })
    }

    /// Drops the session and deletes its scratch directory
    pub async fn cleanup(&self, session_id: &str) -> Result<(), ServiceError> {
        let session = self.registry.remove(session_id).await?;
        remove_scratch(session.scratch_dir()).await.map_err(|e| {
            ServiceError::Infrastructure(format!(
                "failed to remove {}: {}",
                session.scratch_dir().display(),
                e
            ))
        })?;
        info!(session_id, "Session cleaned up");
        Ok(())
    }

    pub fn subscribe(&self, session_id: Option<&str>) -> UpdateReceiver {
        match session_id {
            Some(id) => self.events.subscribe_session(id),
            None => self.events.subscribe(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
