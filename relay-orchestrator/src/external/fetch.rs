//! Plain HTTP retrieval of remote pages

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;

use crate::resilience::CallError;

/// A fetched remote resource
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Document {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("html"))
            .unwrap_or_else(|| self.body.trim_start().starts_with('<'))
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document, CallError>;
}

#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("relay-orchestrator/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build page fetcher HTTP client")?;

        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<Document, CallError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(CallError::Transient(format!("{} is temporarily unavailable", url)));
        }
        if !status.is_success() {
            return Err(CallError::External(format!(
                "GET {} returned status {}",
                url, status
            )));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(Document {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_returns_body_and_content_type() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/about");
                then.status(200)
                    .header("content-type", "text/html; charset=utf-8")
                    .body("<html><title>About</title></html>");
            })
            .await;

        let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).unwrap();
        let document = fetcher.fetch(&server.url("/about")).await.unwrap();

        assert_eq!(document.status, 200);
        assert!(document.is_html());
        assert!(document.body.contains("<title>About</title>"));
        assert!(document.url.ends_with("/about"));
    }

    #[tokio::test]
    async fn test_not_found_is_external() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&server.url("/missing")).await.unwrap_err();

        assert!(matches!(err, CallError::External(_)));
        assert!(err.to_string().contains("404"));
    }
}
