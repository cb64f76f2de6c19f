use crate::stack::Platform;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(title: &str, url: &str, snippet: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }
}

/// Documentation lookup, ranked best first
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;
}

/// Used when no search service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSearch;

#[async_trait]
impl DocumentSearch for NoopSearch {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }
}

/// Static payload substituted when search fails or finds nothing
pub fn fallback_references(platform: Platform) -> Vec<SearchResult> {
    let mut refs = vec![SearchResult::new(
        "Dockerfile best practices",
        "https://docs.docker.com/build/building/best-practices/",
        "Multi-stage builds, layer caching and minimal base images.",
    )];

    let platform_ref = match platform {
        Platform::NodeJs => Some(SearchResult::new(
            "Containerize a Node.js application",
            "https://docs.docker.com/guides/nodejs/",
            "Install production dependencies with npm ci and run as a non-root user.",
        )),
        Platform::Python => Some(SearchResult::new(
            "Containerize a Python application",
            "https://docs.docker.com/guides/python/",
            "Pin dependencies in requirements.txt and use a slim base image.",
        )),
        Platform::Go => Some(SearchResult::new(
            "Containerize a Go application",
            "https://docs.docker.com/guides/golang/",
            "Build a static binary and copy it into a minimal runtime image.",
        )),
        Platform::Rust => Some(SearchResult::new(
            "Containerize a Rust application",
            "https://docs.docker.com/guides/rust/",
            "Compile in a builder stage and ship only the release binary.",
        )),
        Platform::Java => Some(SearchResult::new(
            "Containerize a Java application",
            "https://docs.docker.com/guides/java/",
            "Package with Maven or Gradle and run on a JRE-only image.",
        )),
        Platform::Unknown => None,
    };
    refs.extend(platform_ref);

    refs.push(SearchResult::new(
        "GitHub Actions workflow syntax",
        "https://docs.github.com/actions/using-workflows/workflow-syntax-for-github-actions",
        "Jobs, steps and triggers for CI workflows.",
    ));
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_search_is_empty() {
        let results = NoopSearch.search("node docker", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_fallback_references() {
        assert_eq!(fallback_references(Platform::Unknown).len(), 2);

        let node = fallback_references(Platform::NodeJs);
        assert_eq!(node.len(), 3);
        assert!(node.iter().all(|r| r.url.starts_with("https://")));
    }
}
