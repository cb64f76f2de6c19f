use super::{RegistryError, Session, SessionTransition};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// In-memory session table.
///
/// The outer lock only guards membership; each session has its own mutex, so
/// updates to different sessions never wait on each other.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session in `cloning` state and returns its id
    pub async fn create(
        &self,
        repo_url: impl Into<String>,
        repo_name: impl Into<String>,
        scratch_root: impl Into<PathBuf>,
    ) -> String {
        self.create_for_user(None, repo_url, repo_name, scratch_root)
            .await
    }

    pub async fn create_for_user(
        &self,
        user_id: Option<String>,
        repo_url: impl Into<String>,
        repo_name: impl Into<String>,
        scratch_root: impl Into<PathBuf>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let scratch_dir = scratch_root.into().join(&id);
        let session = Session::new(id.clone(), repo_url, repo_name, user_id, scratch_dir);

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!(session_id = %id, "Session created");
        id
    }

    async fn entry(&self, id: &str) -> Result<Arc<Mutex<Session>>, RegistryError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Snapshot of the session
    pub async fn get(&self, id: &str) -> Result<Session, RegistryError> {
        let entry = self.entry(id).await?;
        let session = entry.lock().await;
        Ok(session.clone())
    }

    /// Applies `transition` and returns the updated snapshot
    pub async fn update(
        &self,
        id: &str,
        transition: SessionTransition,
    ) -> Result<Session, RegistryError> {
        let entry = self.entry(id).await?;
        let mut session = entry.lock().await;
        let from = session.status();
        session.apply(transition)?;
        info!(session_id = %id, from = %from, to = %session.status(), "Session transition");
        Ok(session.clone())
    }

    pub async fn remove(&self, id: &str) -> Result<Session, RegistryError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        let session = entry.lock().await;
        Ok(session.clone())
    }

    /// Snapshots of every session, oldest first
    pub async fn list_all(&self) -> Vec<Session> {
        let entries: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut sessions = Vec::with_capacity(entries.len());
        for entry in entries {
            sessions.push(entry.lock().await.clone());
        }
        sessions.sort_by_key(|s| s.created_at());
        sessions
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, id: &str, by: chrono::Duration) {
        if let Ok(entry) = self.entry(id).await {
            entry.lock().await.backdate(by);
        }
    }
}
