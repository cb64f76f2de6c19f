use super::RegistryError;
use crate::pipeline::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Cloning,
    Cloned,
    Analyzing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Cloning => "cloning",
            SessionStatus::Cloned => "cloned",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle change requested by the service
#[derive(Debug, Clone)]
pub enum SessionTransition {
    Cloned { local_path: PathBuf },
    AnalysisStarted,
    Completed { result: Box<PipelineState> },
    Failed { error: String },
}

impl SessionTransition {
    pub fn target(&self) -> SessionStatus {
        match self {
            SessionTransition::Cloned { .. } => SessionStatus::Cloned,
            SessionTransition::AnalysisStarted => SessionStatus::Analyzing,
            SessionTransition::Completed { .. } => SessionStatus::Completed,
            SessionTransition::Failed { .. } => SessionStatus::Failed,
        }
    }
}

/// One analysis run. Fields are read-only outside this module; the only way
/// to change a session is [`Session::apply`], which keeps the lifecycle
/// one-directional and `analysis_result` present exactly when completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: String,
    repo_url: String,
    repo_name: String,
    user_id: Option<String>,
    scratch_dir: PathBuf,
    local_path: Option<PathBuf>,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    cloned_at: Option<DateTime<Utc>>,
    analysis_started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    analysis_result: Option<Box<PipelineState>>,
}

impl Session {
    pub(crate) fn new(
        id: String,
        repo_url: impl Into<String>,
        repo_name: impl Into<String>,
        user_id: Option<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            repo_url: repo_url.into(),
            repo_name: repo_name.into(),
            user_id,
            scratch_dir: scratch_dir.into(),
            local_path: None,
            status: SessionStatus::Cloning,
            created_at: Utc::now(),
            cloned_at: None,
            analysis_started_at: None,
            completed_at: None,
            error_message: None,
            analysis_result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Per-session directory removed on cleanup
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn cloned_at(&self) -> Option<DateTime<Utc>> {
        self.cloned_at
    }

    pub fn analysis_started_at(&self) -> Option<DateTime<Utc>> {
        self.analysis_started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn analysis_result(&self) -> Option<&PipelineState> {
        self.analysis_result.as_deref()
    }

    /// Most recent lifecycle timestamp
    pub fn last_activity(&self) -> DateTime<Utc> {
        [self.cloned_at, self.analysis_started_at, self.completed_at]
            .into_iter()
            .flatten()
            .fold(self.created_at, |latest, t| latest.max(t))
    }

    pub fn apply(&mut self, transition: SessionTransition) -> Result<(), RegistryError> {
        let target = transition.target();
        let allowed = match (&transition, self.status) {
            (SessionTransition::Failed { .. }, from) => !from.is_terminal(),
            (SessionTransition::Cloned { .. }, SessionStatus::Cloning) => true,
            (SessionTransition::AnalysisStarted, SessionStatus::Cloned) => true,
            (SessionTransition::Completed { .. }, SessionStatus::Analyzing) => true,
            _ => false,
        };
        if !allowed {
            return Err(RegistryError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: target,
            });
        }

        let now = Utc::now();
        match transition {
            SessionTransition::Cloned { local_path } => {
                self.local_path = Some(local_path);
                self.cloned_at = Some(now);
            }
            SessionTransition::AnalysisStarted => {
                self.analysis_started_at = Some(now);
            }
            SessionTransition::Completed { result } => {
                self.analysis_result = Some(result);
                self.completed_at = Some(now);
            }
            SessionTransition::Failed { error } => {
                self.error_message = Some(error);
                self.completed_at = Some(now);
            }
        }
        self.status = target;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by: chrono::Duration) {
        self.created_at -= by;
        self.cloned_at = self.cloned_at.map(|t| t - by);
        self.analysis_started_at = self.analysis_started_at.map(|t| t - by);
        self.completed_at = self.completed_at.map(|t| t - by);
    }
}
