//! Shared helpers for integration tests
//!
//! Cloning is replaced by fetchers that build the checkout locally, so no
//! test touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use stackpilot::acquire::{AcquireError, Acquirer, RepoUrl, RepositoryFetcher};
use stackpilot::external::{ArtifactStore, MemoryStore};
use stackpilot::llm::{BackendError, LLMClient, LLMRequest, LLMResponse, MockLLMClient};
use stackpilot::pipeline::{FailurePolicy, PipelineConfig};
use stackpilot::progress::{ProgressEvent, ProgressHandler, ProgressUpdate};
use stackpilot::service::AnalysisService;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type Files = Vec<(&'static str, &'static str)>;

/// Writes `files` below `destination`; an empty list yields an empty checkout
pub struct FixtureFetcher {
    files: Files,
}

impl FixtureFetcher {
    pub fn new(files: Files) -> Self {
        Self { files }
    }
}

#[async_trait]
impl RepositoryFetcher for FixtureFetcher {
    async fn fetch(
        &self,
        _url: &RepoUrl,
        _auth_token: Option<&str>,
        destination: &Path,
    ) -> Result<(), AcquireError> {
        write_files(destination, &self.files);
        Ok(())
    }
}

/// Reports success without creating the checkout, so the analyzer fails
pub struct HollowFetcher;

#[async_trait]
impl RepositoryFetcher for HollowFetcher {
    async fn fetch(
        &self,
        _url: &RepoUrl,
        _auth_token: Option<&str>,
        _destination: &Path,
    ) -> Result<(), AcquireError> {
        Ok(())
    }
}

pub struct FailingFetcher;

#[async_trait]
impl RepositoryFetcher for FailingFetcher {
    async fn fetch(
        &self,
        url: &RepoUrl,
        _auth_token: Option<&str>,
        _destination: &Path,
    ) -> Result<(), AcquireError> {
        Err(AcquireError::CloneFailed {
            url: url.to_string(),
            message: "repository not found".to_string(),
        })
    }
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (path, content) in files {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, content).unwrap();
    }
}

pub fn node_react_express() -> Files {
    vec![
        (
            "package.json",
            r#"{
  "name": "shop",
  "scripts": { "build": "react-scripts build", "start": "node server/index.js" },
  "dependencies": {
    "express": "^4.18.2",
    "react": "^18.2.0",
    "react-dom": "^18.2.0",
    "pg": "^8.11.0"
  },
  "devDependencies": { "jest": "^29.0.0" }
}"#,
        ),
        ("package-lock.json", "{}"),
        ("README.md", "# shop\n"),
        ("src/App.jsx", "export default function App() { return null; }\n"),
        ("src/App.test.jsx", "test('renders', () => {});\n"),
        ("server/index.js", "require('express')().listen(3000);\n"),
        (".env.example", "PORT=3000\n"),
        ("node_modules/foo.js", "module.exports = {};\n"),
        (".git/HEAD", "ref: refs/heads/main\n"),
    ]
}

pub fn malformed_manifest() -> Files {
    vec![
        ("package.json", "{ \"name\": \"broken\", \"dependencies\": { "),
        ("index.js", "console.log('hi');\n"),
    ]
}

/// Approves every review; the planner keeps the same reply as its plan
pub fn scripted_llm() -> Arc<MockLLMClient> {
    Arc::new(MockLLMClient::with_fallback(
        r#"{"approved": true, "issues": []}"#,
    ))
}

/// Panics on the first request, as a buggy backend adapter would
pub struct PanickingLLM;

#[async_trait]
impl LLMClient for PanickingLLM {
    async fn chat(&self, _request: LLMRequest) -> Result<LLMResponse, BackendError> {
        panic!("model adapter exploded");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Collects every published update
#[derive(Default)]
pub struct RecordingHandler {
    pub updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingHandler {
    pub fn progress_values(&self, session_id: &str) -> Vec<u8> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.session_id == session_id)
            .map(|u| u.progress)
            .collect()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        if let ProgressEvent::Update(update) = event {
            self.updates.lock().unwrap().push(update.clone());
        }
    }
}

pub struct ServiceOptions {
    pub fetcher: Arc<dyn RepositoryFetcher>,
    pub llm: Arc<dyn LLMClient>,
    pub failure_policy: FailurePolicy,
    pub memory: Option<Arc<dyn MemoryStore>>,
    pub artifact_store: Option<Arc<dyn ArtifactStore>>,
    pub handler: Option<Arc<dyn ProgressHandler>>,
}

impl ServiceOptions {
    pub fn new(fetcher: Arc<dyn RepositoryFetcher>) -> Self {
        Self {
            fetcher,
            llm: scripted_llm(),
            failure_policy: FailurePolicy::ContinueOnError,
            memory: None,
            artifact_store: None,
            handler: None,
        }
    }
}

pub fn build_service(scratch: &Path, options: ServiceOptions) -> Arc<AnalysisService> {
    let acquirer = Acquirer::new(scratch.to_path_buf(), "github.com", options.fetcher);
    let mut builder = AnalysisService::builder(acquirer, options.llm).pipeline_config(
        PipelineConfig::new().with_failure_policy(options.failure_policy),
    );
    if let Some(memory) = options.memory {
        builder = builder.memory(memory);
    }
    if let Some(store) = options.artifact_store {
        builder = builder.artifact_store(store);
    }
    if let Some(handler) = options.handler {
        builder = builder.progress_handler(handler);
    }
    builder.build()
}

pub fn fixture_service(scratch: &Path, files: Files) -> Arc<AnalysisService> {
    build_service(
        scratch,
        ServiceOptions::new(Arc::new(FixtureFetcher::new(files))),
    )
}
