//! End-to-end pipeline runs over local fixture repositories

mod support;

use stackpilot::llm::MockLLMClient;
use stackpilot::pipeline::PlanSource;
use stackpilot::service::CloneRequest;
use stackpilot::scan::{ScanConfig, Scanner};
use stackpilot::session::SessionStatus;
use stackpilot::stack::{classify, Platform};
use std::sync::Arc;
use support::{
    build_service, fixture_service, malformed_manifest, node_react_express, write_files,
    FixtureFetcher, RecordingHandler, ServiceOptions,
};
use tempfile::TempDir;

const REPO: &str = "https://github.com/acme/shop";

#[tokio::test]
async fn test_node_react_express_repository() {
    let scratch = TempDir::new().unwrap();
    let recorder = Arc::new(RecordingHandler::default());
    let mut options = ServiceOptions::new(Arc::new(FixtureFetcher::new(node_react_express())));
    options.handler = Some(recorder.clone());
    let service = build_service(scratch.path(), options);

    let cloned = service
        .clone_repository(CloneRequest::new(REPO))
        .await
        .unwrap();
    assert_eq!(cloned.repo_name, "shop");

    let session = service.run_analysis(&cloned.session_id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);

    let results = service.results(&cloned.session_id).await.unwrap();
    let stack = &results.tech_stack;
    assert_eq!(stack.primary, Platform::NodeJs);
    assert!(stack.frontend.contains(&"React".to_string()));
    assert!(stack.backend.contains(&"Express.js".to_string()));
    assert!(stack.database.contains(&"PostgreSQL".to_string()));

    let dockerfile = &results.files["Dockerfile"];
    assert_eq!(dockerfile.matches("\nFROM ").count(), 2);
    assert!(dockerfile.contains("AS builder"));
    assert!(dockerfile.contains("RUN npm ci"));
    assert!(dockerfile.contains("EXPOSE 3000"));

    let env = &results.files[".env.example"];
    assert!(env.contains("DATABASE_URL=postgresql://"));
    assert!(env.contains("REACT_APP_API_URL="));

    for name in [
        "Dockerfile",
        "deploy.yml",
        ".env.example",
        "deployment-plan.md",
        "verification-report.md",
    ] {
        assert!(results.files.contains_key(name), "missing {}", name);
    }

    assert!(results.codebase_analysis.has_tests);
    assert!(results.codebase_analysis.has_documentation);
    assert!(results.errors.is_empty(), "errors: {:?}", results.errors);
    assert!(results.verification_results.as_ref().unwrap().passed);

    let state = session.analysis_result().unwrap();
    let structure = state.project_structure().unwrap();
    assert!(structure.contains(".env.example"));
    assert!(structure.contains("src/App.jsx"));
    assert!(!structure.paths().any(|p| p.starts_with("node_modules")));
    assert!(!structure.paths().any(|p| p.starts_with(".git/") || p == ".git"));

    let progress = recorder.progress_values(&cloned.session_id);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
    assert_eq!(progress.last(), Some(&100));
}

#[tokio::test]
async fn test_empty_repository() {
    let scratch = TempDir::new().unwrap();
    let service = fixture_service(scratch.path(), vec![]);

    let cloned = service
        .clone_repository(CloneRequest::new(
            "https://github.com/acme/empty",
        ))
        .await
        .unwrap();
    service.run_analysis(&cloned.session_id).await.unwrap();

    let results = service.results(&cloned.session_id).await.unwrap();
    assert_eq!(results.tech_stack.primary, Platform::Unknown);
    assert_eq!(results.tech_stack.confidence, 0);
    assert_eq!(results.codebase_analysis.file_count, 0);
    assert!(results.files["Dockerfile"].contains("FROM alpine"));
    assert!(results.files["deploy.yml"].contains("jobs:"));

    let verification = results.verification_results.unwrap();
    assert!(verification.low_confidence);
}

#[tokio::test]
async fn test_malformed_manifest_is_recorded_not_fatal() {
    let scratch = TempDir::new().unwrap();
    let service = fixture_service(scratch.path(), malformed_manifest());

    let cloned = service
        .clone_repository(CloneRequest::new(
            "https://github.com/acme/broken",
        ))
        .await
        .unwrap();
    let session = service.run_analysis(&cloned.session_id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);

    let results = service.results(&cloned.session_id).await.unwrap();
    assert_eq!(results.tech_stack.primary, Platform::NodeJs);
    assert!(results.tech_stack.frameworks.is_empty());
    assert!(results
        .errors
        .iter()
        .any(|e| e.starts_with("analyzer:") && e.contains("package.json")));
    assert!(results.files.contains_key("Dockerfile"));
}

#[tokio::test]
async fn test_unreachable_model_degrades_to_defaults() {
    let scratch = TempDir::new().unwrap();
    let mut options = ServiceOptions::new(Arc::new(FixtureFetcher::new(node_react_express())));
    options.llm = Arc::new(MockLLMClient::new());
    let service = build_service(scratch.path(), options);

    let cloned = service
        .clone_repository(CloneRequest::new(REPO))
        .await
        .unwrap();
    service.run_analysis(&cloned.session_id).await.unwrap();

    let results = service.results(&cloned.session_id).await.unwrap();
    assert_eq!(results.plan.unwrap().source, PlanSource::Default);
    assert!(results.verification_results.unwrap().review.is_none());
    assert!(results
        .messages
        .iter()
        .any(|m| m.agent == "verifier" && m.message == "Model review skipped"));
    assert!(results.errors.is_empty());
}

#[test]
fn test_classification_is_idempotent() {
    let repo = TempDir::new().unwrap();
    write_files(repo.path(), &node_react_express());

    let structure = Scanner::new(ScanConfig::default()).scan(repo.path()).unwrap();
    let first = classify(repo.path(), &structure);
    let second = classify(repo.path(), &structure);
    assert_eq!(first, second);

    let rescanned = Scanner::new(ScanConfig::default()).scan(repo.path()).unwrap();
    assert_eq!(classify(repo.path(), &rescanned), first);
}
