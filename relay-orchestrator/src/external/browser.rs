//! Hosted browser automation client

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::BrowserSettings;
use crate::resilience::CallError;

/// A rendered page captured by the browser service
#[derive(Debug, Clone, PartialEq)]
pub struct PageCapture {
    pub session_id: String,
    pub title: Option<String>,
    /// PNG bytes
    pub image: Vec<u8>,
    /// Human-viewable recording of the browser session
    pub replay_url: String,
}

#[async_trait]
pub trait BrowserService: Send + Sync {
    async fn capture(&self, url: &str) -> Result<PageCapture, CallError>;

    fn is_configured(&self) -> bool;

    fn endpoint(&self) -> String;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureRequest<'a> {
    project_id: &'a str,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptureResponse {
    session_id: String,
    #[serde(default)]
    title: Option<String>,
    /// Base64 encoded PNG
    image: String,
}

#[derive(Debug, Clone)]
pub struct HttpBrowserService {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    project_id: Option<String>,
    replay_base_url: String,
}

impl HttpBrowserService {
    pub fn new(settings: &BrowserSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build browser HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            project_id: settings.project_id.clone(),
            replay_base_url: settings.replay_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn replay_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}", self.replay_base_url, session_id)
    }
}

#[async_trait]
impl BrowserService for HttpBrowserService {
    async fn capture(&self, url: &str) -> Result<PageCapture, CallError> {
        let (Some(api_key), Some(project_id)) = (self.api_key.as_deref(), self.project_id.as_deref())
        else {
            return Err(CallError::external(
                "browser service credentials not configured",
            ));
        };

        let response = self
            .http
            .post(format!("{}/v1/captures", self.base_url))
            .header("X-BB-API-Key", api_key)
            .json(&CaptureRequest { project_id, url })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: CaptureResponse = response.json().await.map_err(|e| {
                    CallError::External(format!("Failed to parse capture response: {}", e))
                })?;
                let image = STANDARD.decode(body.image.as_bytes()).map_err(|e| {
                    CallError::External(format!("capture image is not valid base64: {}", e))
                })?;

                Ok(PageCapture {
                    replay_url: self.replay_url(&body.session_id),
                    session_id: body.session_id,
                    title: body.title.filter(|t| !t.trim().is_empty()),
                    image,
                })
            }
            StatusCode::SERVICE_UNAVAILABLE => Err(CallError::Transient(
                "browser service has no session available".to_string(),
            )),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CallError::external(
                "browser service rejected the API key",
            )),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(CallError::External(format!(
                    "browser service error (status {}): {}",
                    status, body
                )))
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.project_id.is_some()
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn service_for(server: &MockServer, configured: bool) -> HttpBrowserService {
        HttpBrowserService::new(&BrowserSettings {
            base_url: server.base_url(),
            api_key: configured.then(|| "bb_test".to_string()),
            project_id: configured.then(|| "proj_1".to_string()),
            replay_base_url: "https://replay.example.com/".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_capture_decodes_image_and_builds_replay_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/captures")
                    .header("X-BB-API-Key", "bb_test")
                    .json_body(json!({ "projectId": "proj_1", "url": "https://example.com" }));
                then.status(201).json_body(json!({
                    "sessionId": "sess_42",
                    "title": "Example Domain",
                    "image": STANDARD.encode(PNG_HEADER),
                }));
            })
            .await;

        let capture = service_for(&server, true)
            .capture("https://example.com")
            .await
            .unwrap();

        assert_eq!(capture.session_id, "sess_42");
        assert_eq!(capture.title.as_deref(), Some("Example Domain"));
        assert_eq!(capture.image, PNG_HEADER);
        assert_eq!(capture.replay_url, "https://replay.example.com/sessions/sess_42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_image_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/captures");
                then.status(200)
                    .json_body(json!({ "sessionId": "s", "image": "%%% not base64 %%%" }));
            })
            .await;

        let result = service_for(&server, true).capture("https://example.com").await;
        assert!(matches!(result, Err(CallError::External(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_service_fails_fast() {
        let server = MockServer::start_async().await;
        let service = service_for(&server, false);

        assert!(!service.is_configured());
        assert!(service.capture("https://example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_server_error_is_external() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/captures");
                then.status(500).body("navigation failed");
            })
            .await;

        let err = service_for(&server, true)
            .capture("https://unreachable.example")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("navigation failed"));
    }
}
