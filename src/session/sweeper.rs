use super::SessionRegistry;
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<String>,
    /// Sessions whose scratch directory could not be deleted; kept for the
    /// next sweep
    pub failed: Vec<String>,
}

/// Purges sessions idle for longer than `retention` as of `now`
pub async fn sweep_expired(
    registry: &SessionRegistry,
    retention: Duration,
    now: DateTime<Utc>,
) -> SweepReport {
    let mut report = SweepReport::default();

    for session in registry.list_all().await {
        let idle = match (now - session.last_activity()).to_std() {
            Ok(idle) => idle,
            Err(_) => continue,
        };
        if idle <= retention {
            continue;
        }

        if let Err(err) = remove_scratch(session.scratch_dir()).await {
            warn!(
                session_id = %session.id(),
                path = %session.scratch_dir().display(),
                error = %err,
                "Failed to remove session scratch directory"
            );
            report.failed.push(session.id().to_string());
            continue;
        }

        if registry.remove(session.id()).await.is_ok() {
            debug!(session_id = %session.id(), idle_secs = idle.as_secs(), "Session expired");
            report.removed.push(session.id().to_string());
        }
    }

    if !report.removed.is_empty() || !report.failed.is_empty() {
        info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Session sweep finished"
        );
    }
    report
}

pub(crate) async fn remove_scratch(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Runs [`sweep_expired`] every `interval` until the handle is aborted
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    retention: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep_expired(&registry, retention, Utc::now()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionTransition;
    use std::fs;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let scratch = TempDir::new().unwrap();
        let registry = SessionRegistry::new();

        let old = registry.create("u", "old", scratch.path()).await;
        let fresh = registry.create("u", "fresh", scratch.path()).await;
        let old_dir = scratch.path().join(&old);
        fs::create_dir_all(old_dir.join("repo")).unwrap();
        fs::write(old_dir.join("repo/file.txt"), "x").unwrap();

        registry.backdate(&old, chrono::Duration::hours(25)).await;

        let report = sweep_expired(&registry, DAY, Utc::now()).await;

        assert_eq!(report.removed, vec![old.clone()]);
        assert!(report.failed.is_empty());
        assert!(!old_dir.exists());
        assert!(registry.get(&old).await.is_err());
        assert!(registry.get(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_uses_last_activity() {
        let scratch = TempDir::new().unwrap();
        let registry = SessionRegistry::new();
        let id = registry.create("u", "web", scratch.path()).await;
        registry.backdate(&id, chrono::Duration::hours(30)).await;
        registry
            .update(
                &id,
                SessionTransition::Cloned {
                    local_path: scratch.path().join(&id).join("web"),
                },
            )
            .await
            .unwrap();

        let report = sweep_expired(&registry, DAY, Utc::now()).await;
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn test_missing_scratch_dir_is_not_a_failure() {
        let registry = SessionRegistry::new();
        let id = registry
            .create("u", "web", "/nonexistent/stackpilot-scratch")
            .await;
        registry.backdate(&id, chrono::Duration::hours(48)).await;

        let report = sweep_expired(&registry, DAY, Utc::now()).await;
        assert_eq!(report.removed, vec![id]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        use std::os::unix::fs::PermissionsExt;

        let scratch = TempDir::new().unwrap();
        let registry = SessionRegistry::new();

        let stuck = registry.create("u", "stuck", scratch.path()).await;
        let other = registry.create("u", "other", scratch.path()).await;
        let stuck_dir = scratch.path().join(&stuck);
        fs::create_dir_all(stuck_dir.join("locked")).unwrap();
        fs::write(stuck_dir.join("locked/file"), "x").unwrap();
        fs::set_permissions(stuck_dir.join("locked"), fs::Permissions::from_mode(0o500)).unwrap();

        registry.backdate(&stuck, chrono::Duration::hours(48)).await;
        registry.backdate(&other, chrono::Duration::hours(48)).await;

        let report = sweep_expired(&registry, DAY, Utc::now()).await;

        // root ignores permission bits, in which case both sessions go
        assert!(report.removed.contains(&other));
        if !report.failed.is_empty() {
            assert_eq!(report.failed, vec![stuck.clone()]);
            assert!(registry.get(&stuck).await.is_ok());
        }

        fs::set_permissions(stuck_dir.join("locked"), fs::Permissions::from_mode(0o700)).ok();
    }
}
