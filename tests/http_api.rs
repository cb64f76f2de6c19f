//! HTTP API driven through the router without binding a socket

mod support;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use stackpilot::server::router;
use std::time::Duration;
use support::{fixture_service, node_react_express};
use tempfile::TempDir;
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>, Option<String>) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec(), content_type)
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes, _) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn app(scratch: &TempDir) -> Router {
    router(fixture_service(scratch.path(), node_react_express()))
}

async fn clone_session(app: &Router) -> String {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/api/repositories/clone",
        Some(json!({ "repo_url": "https://github.com/acme/shop" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["repo_name"], "shop");
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let scratch = TempDir::new().unwrap();
    let (status, body) = send_json(&app(&scratch), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], stackpilot::VERSION);
}

#[tokio::test]
async fn test_clone_rejects_bad_input() {
    let scratch = TempDir::new().unwrap();
    let app = app(&scratch);

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/repositories/clone",
        Some(json!({ "repo_url": "ftp://example.com/repo" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidUrl");
    assert!(!body["message"].as_str().unwrap().is_empty());

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/repositories/clone",
        Some(json!({ "auth_token": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidUrl");

    let (status, body) = send_json(&app, Method::GET, "/api/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_full_session_flow() {
    let scratch = TempDir::new().unwrap();
    let app = app(&scratch);
    let id = clone_session(&app).await;

    let (status, body) =
        send_json(&app, Method::GET, &format!("/api/sessions/{}/status", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cloned");

    let (status, body) =
        send_json(&app, Method::POST, &format!("/api/sessions/{}/analyze", id), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["session_id"], id.as_str());
    assert_eq!(body["status"], "analyzing");

    let mut final_status = Value::Null;
    for _ in 0..250 {
        let (_, body) =
            send_json(&app, Method::GET, &format!("/api/sessions/{}/status", id), None).await;
        if body["status"] == "completed" || body["status"] == "failed" {
            final_status = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(final_status["status"], "completed", "{}", final_status);

    let (status, results) =
        send_json(&app, Method::GET, &format!("/api/sessions/{}/results", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["tech_stack"]["primary"], json!(stackpilot::Platform::NodeJs));
    assert!(results["files"]["Dockerfile"].as_str().unwrap().contains("EXPOSE 3000"));
    assert_eq!(results["metadata"]["repo_name"], "shop");

    let (status, bytes, content_type) = send(
        &app,
        Method::GET,
        &format!("/api/sessions/{}/files/Dockerfile", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
    assert!(String::from_utf8(bytes).unwrap().starts_with("# Generated by stackpilot"));

    let (status, _, content_type) = send(
        &app,
        Method::GET,
        &format!("/api/sessions/{}/files/deploy.yml", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/x-yaml"));

    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/api/sessions/{}/files/chart.yaml", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");

    let (status, _) =
        send_json(&app, Method::DELETE, &format!("/api/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!scratch.path().join(&id).exists());

    let (status, _) =
        send_json(&app, Method::GET, &format!("/api/sessions/{}/status", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_errors_map_to_statuses() {
    let scratch = TempDir::new().unwrap();
    let app = app(&scratch);

    let (status, body) =
        send_json(&app, Method::POST, "/api/sessions/missing/analyze", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "InvalidSession");

    let id = clone_session(&app).await;
    let (status, body) =
        send_json(&app, Method::GET, &format!("/api/sessions/{}/results", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "NotReady");

    let (status, body) = send_json(&app, Method::GET, "/api/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["session_id"], id.as_str());
}
