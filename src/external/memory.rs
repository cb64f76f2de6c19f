use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One completed analysis, as remembered for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub session_id: String,
    pub repo_url: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

/// Long-term memory keyed by user
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn record(&self, interaction: Interaction) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMemory;

#[async_trait]
impl MemoryStore for NoopMemory {
    async fn record(&self, _interaction: Interaction) -> Result<()> {
        Ok(())
    }
}

/// Process-local memory, mostly for tests and single-node use
#[derive(Debug, Default)]
pub struct InMemoryMemory {
    interactions: Mutex<Vec<Interaction>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interactions_for(&self, user_id: &str) -> Vec<Interaction> {
        self.interactions
            .lock()
            .map(|items| {
                items
                    .iter()
                    .filter(|i| i.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemory {
    async fn record(&self, interaction: Interaction) -> Result<()> {
        self.interactions
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?
            .push(interaction);
        Ok(())
    }
}
