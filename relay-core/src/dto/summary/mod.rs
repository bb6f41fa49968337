//! Synchronous summarization DTOs

use serde::{Deserialize, Serialize};

use crate::domain::task::SummaryStyle;

/// Request to summarize a text without creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
    #[serde(default)]
    pub style: SummaryStyle,
}

/// Summarization answer
///
/// `fallback` is set when the hosted model could not serve the request and the
/// summary was derived locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub original_text: String,
    pub summary_text: String,
    pub style: SummaryStyle,
    pub fallback: bool,
}
