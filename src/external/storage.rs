use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Blob storage for finished artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores `content` and returns its file id
    async fn put(&self, name: &str, content: Vec<u8>) -> Result<String>;

    async fn download_url(&self, file_id: &str) -> Result<String>;
}

struct StoredFile {
    name: String,
    content: Vec<u8>,
}

pub struct InMemoryArtifactStore {
    base_url: String,
    files: RwLock<HashMap<String, StoredFile>>,
}

impl InMemoryArtifactStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, file_id: &str) -> Option<(String, Vec<u8>)> {
        self.files
            .read()
            .await
            .get(file_id)
            .map(|f| (f.name.clone(), f.content.clone()))
    }

    pub async fn file_count(&self) -> usize {
        self.files.read().await.len()
    }
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self::new("memory://artifacts")
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, name: &str, content: Vec<u8>) -> Result<String> {
        let file_id = Uuid::new_v4().to_string();
        self.files.write().await.insert(
            file_id.clone(),
            StoredFile {
                name: name.to_string(),
                content,
            },
        );
        Ok(file_id)
    }

    async fn download_url(&self, file_id: &str) -> Result<String> {
        if self.files.read().await.contains_key(file_id) {
            Ok(format!("{}/{}", self.base_url, file_id))
        } else {
            Err(anyhow!("unknown file id: {}", file_id))
        }
    }
}
