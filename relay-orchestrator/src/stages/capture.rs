//! Page capture through the hosted browser

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use relay_core::domain::stage::StageName;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::external::browser::BrowserService;
use crate::resilience::RetryPolicy;
use crate::stages::{Stage, StageContext, StageError, StageOutput};

pub struct CaptureStage {
    browser: Arc<dyn BrowserService>,
    policy: RetryPolicy,
}

impl CaptureStage {
    pub fn new(browser: Arc<dyn BrowserService>, policy: RetryPolicy) -> Self {
        Self { browser, policy }
    }
}

#[async_trait]
impl Stage for CaptureStage {
    fn name(&self) -> StageName {
        StageName::Capture
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let url = ctx.url()?;
        let capture = self
            .policy
            .call("capture", || self.browser.capture(url))
            .await?;

        info!(
            "Captured {} ({} bytes), replay at {}",
            url,
            capture.image.len(),
            capture.replay_url
        );

        Ok(StageOutput::new(json!({
            "url": url,
            "title": capture.title,
            "session_id": capture.session_id,
            "replay_url": capture.replay_url,
            "content_type": "image/png",
            "image_bytes": capture.image.len(),
            "image_base64": STANDARD.encode(&capture.image),
        })))
    }
}
