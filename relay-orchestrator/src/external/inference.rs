//! Hosted summarization model client

use anyhow::Context;
use async_trait::async_trait;
use relay_core::domain::task::SummaryStyle;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::InferenceSettings;
use crate::resilience::CallError;

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Summarizes `text` with a length target derived from `style`
    async fn summarize(&self, text: &str, style: SummaryStyle) -> Result<String, CallError>;

    /// Whether credentials are present at all
    fn is_configured(&self) -> bool;

    /// Endpoint reported by the health check
    fn endpoint(&self) -> String;

    /// Reports whether the service answers at all
    async fn probe(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    inputs: &'a str,
    parameters: SummarizeParameters,
}

#[derive(Debug, Serialize)]
struct SummarizeParameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
    early_stopping: bool,
}

impl SummarizeParameters {
    fn for_style(style: SummaryStyle) -> Self {
        let (max_length, min_length) = match style {
            SummaryStyle::Concise => (50, 20),
            SummaryStyle::Detailed => (100, 40),
        };

        Self {
            max_length,
            min_length,
            do_sample: false,
            early_stopping: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

/// Client for a hosted inference API serving a summarization model
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
    model: String,
}

impl HttpInferenceClient {
    pub fn new(settings: &InferenceSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build inference HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            model: settings.model.clone(),
        })
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn summarize(&self, text: &str, style: SummaryStyle) -> Result<String, CallError> {
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| CallError::external("inference API token not configured"))?;

        let request = SummarizeRequest {
            inputs: text,
            parameters: SummarizeParameters::for_style(style),
        };

        let response = self
            .http
            .post(self.model_url())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let items: Vec<SummaryItem> = response.json().await.map_err(|e| {
                    CallError::External(format!("Failed to parse inference response: {}", e))
                })?;
                items
                    .into_iter()
                    .next()
                    .map(|item| item.summary_text)
                    .ok_or_else(|| CallError::external("inference response contained no summary"))
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                let body = response.text().await.unwrap_or_default();
                Err(CallError::Transient(format!("model is warming up: {}", body)))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CallError::external(
                "inference API rejected the token, check INFERENCE_API_TOKEN",
            )),
            StatusCode::TOO_MANY_REQUESTS => {
                let body = response.text().await.unwrap_or_default();
                Err(CallError::External(format!("inference API rate limit exceeded: {}", body)))
            }
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(CallError::External(format!(
                    "inference API error (status {}): {}",
                    status, body
                )))
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    fn endpoint(&self) -> String {
        self.model_url()
    }

    async fn probe(&self) -> bool {
        let Some(token) = self.api_token.as_deref() else {
            return false;
        };

        self.http
            .get(self.model_url())
            .bearer_auth(token)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|response| {
                let status = response.status();
                // a loading model still counts as reachable
                !status.is_server_error() || status == StatusCode::SERVICE_UNAVAILABLE
            })
            .unwrap_or(false)
    }
}
