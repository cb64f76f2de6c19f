//! Repository snapshot acquisition
//!
//! Turns a validated repository URL into a local checkout inside a
//! per-session scratch directory. The actual transfer is delegated to a
//! [`RepositoryFetcher`], so tests can substitute a local fixture copy for
//! the network clone.

mod git;
mod url;

pub use git::GitFetcher;
pub use url::RepoUrl;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },

    #[error("Scratch directory error at {}: {source}", path.display())]
    Infrastructure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Copies a remote repository into `destination`, which does not exist yet
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &RepoUrl,
        auth_token: Option<&str>,
        destination: &Path,
    ) -> Result<(), AcquireError>;
}

/// Result of a successful acquisition
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub local_path: PathBuf,
    pub repo_name: String,
}

pub struct Acquirer {
    scratch_root: PathBuf,
    allowed_host: String,
    fetcher: Arc<dyn RepositoryFetcher>,
}

impl Acquirer {
    pub fn new(
        scratch_root: PathBuf,
        allowed_host: impl Into<String>,
        fetcher: Arc<dyn RepositoryFetcher>,
    ) -> Self {
        Self {
            scratch_root,
            allowed_host: allowed_host.into(),
            fetcher,
        }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    pub fn validate(&self, repo_url: &str) -> Result<RepoUrl, AcquireError> {
        RepoUrl::parse(repo_url, &self.allowed_host)
    }

    /// Directory owned by one session; nothing else reads or writes inside it
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.scratch_root.join(session_id)
    }

    pub async fn acquire(
        &self,
        session_id: &str,
        url: &RepoUrl,
        auth_token: Option<&str>,
    ) -> Result<Snapshot, AcquireError> {
        let session_dir = self.session_dir(session_id);
        tokio::fs::create_dir_all(&session_dir)
            .await
            .map_err(|source| AcquireError::Infrastructure {
                path: session_dir.clone(),
                source,
            })?;

        let local_path = session_dir.join(url.repo_name());

        if let Err(err) = self.fetcher.fetch(url, auth_token, &local_path).await {
            if let Err(cleanup_err) = tokio::fs::remove_dir_all(&session_dir).await {
                warn!(
                    path = %session_dir.display(),
                    error = %cleanup_err,
                    "Failed to remove partial checkout"
                );
            }
            return Err(err);
        }

        info!(
            session_id,
            repository = %url,
            path = %local_path.display(),
            "Repository acquired"
        );

        Ok(Snapshot {
            local_path,
            repo_name: url.repo_name().to_string(),
        })
    }
}
