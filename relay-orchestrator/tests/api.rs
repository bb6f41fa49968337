//! HTTP contract tests against the full router, with no hosted services configured

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use relay_orchestrator::api::create_router;
use relay_orchestrator::config::Config;
use relay_orchestrator::service::Services;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let mut config = Config::default();
    config.inference.timeout = Duration::from_millis(500);
    config.inference.warmup_backoff = Duration::from_millis(1);
    config.browser.timeout = Duration::from_secs(1);
    config.fetch_timeout = Duration::from_secs(1);
    config.workflow_timeout = Duration::from_secs(2);

    let services = Services::from_config(&config).unwrap();
    create_router(services, &config.cors_allowed_origins)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn wait_terminal(app: &Router, id: &str) -> Value {
    for _ in 0..100 {
        let (status, body) = send(app, get(&format!("/tasks/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "completed" || body["status"] == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {id} did not finish");
}

#[tokio::test]
async fn test_reverse_task_lifecycle() {
    let app = app();

    let (status, body) = send(&app, post("/tasks", json!({"kind": "reverse", "text": "hello world"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "running");
    assert_eq!(body["kind"], "reverse");
    assert_eq!(body["text"], "hello world");

    let id = body["task_id"].as_str().unwrap().to_string();
    let done = wait_terminal(&app, &id).await;

    assert_eq!(done["status"], "completed");
    assert_eq!(done["result"]["output"]["reversed_text"], "dlrow olleh");
    assert_eq!(done["result"]["output"]["original_length"], 11);
    assert_eq!(done["stages"][0]["stage"], "transform");
    assert!(done.get("error").is_none());

    let (status, listed) = send(&app, get("/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
}

#[tokio::test]
async fn test_blank_text_is_rejected() {
    let app = app();

    let (status, body) = send(&app, post("/tasks", json!({"kind": "reverse", "text": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("empty"));

    let (_, listed) = send(&app, get("/tasks")).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_unknown_kind_and_bad_url_are_rejected() {
    let app = app();

    let (status, body) = send(&app, post("/tasks", json!({"kind": "teleport"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let (status, body) = send(&app, post("/tasks", json!({"kind": "website", "url": "ftp://example.com"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let app = app();

    let (status, body) = send(&app, get("/tasks/00000000-0000-0000-0000-000000000000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "task_not_found");

    let (status, body) = send(&app, get("/tasks/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_artifacts_of_task_without_files() {
    let app = app();

    let (_, body) = send(&app, post("/tasks", json!({"kind": "reverse", "text": "abc"}))).await;
    let id = body["task_id"].as_str().unwrap().to_string();
    wait_terminal(&app, &id).await;

    let (status, body) = send(&app, get(&format!("/tasks/{id}/artifacts"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "no_artifacts");
}

#[tokio::test]
async fn test_failed_task_artifacts_conflict() {
    let app = app();

    let (status, body) = send(&app, post("/tasks", json!({"kind": "screenshot", "url": "https://example.com"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["task_id"].as_str().unwrap().to_string();

    let failed = wait_terminal(&app, &id).await;
    assert_eq!(failed["status"], "failed");
    assert!(failed["error"].as_str().unwrap().contains("capture"));
    assert!(failed.get("result").is_none());

    let (status, body) = send(&app, get(&format!("/tasks/{id}/artifacts"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "task_not_completed");
}

#[tokio::test]
async fn test_summarize_falls_back_without_token() {
    let app = app();
    let text = "Rust is fast. Rust is safe. Tokio runs tasks. Axum serves HTTP.";

    let (status, body) = send(&app, post("/summarize", json!({"text": text}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["style"], "concise");
    assert_eq!(body["original_text"], text);
    assert_eq!(body["summary_text"], "Rust is fast. Tokio runs tasks.");

    let (status, body) = send(&app, post("/summarize", json!({"text": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_health_reports_unconfigured_services() {
    let app = app();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app"], "healthy");
    assert_eq!(body["inference"]["status"], "not configured");
    assert_eq!(body["browser"]["configured"], false);
    assert_eq!(body["features"]["string_reversal"], true);
    assert_eq!(body["features"]["ai_summarization"], false);
    assert_eq!(body["features"]["website_synthesis"], false);
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let app = app();

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}
