//! Synchronous summarization without a task

use relay_core::domain::task::SummaryStyle;
use relay_core::dto::summary::SummarizeResponse;

use crate::service::Services;
use crate::service::task::{TaskError, validate_text};

/// Summarize `text` right away through the resilient summarizer
pub async fn summarize_now(
    services: &Services,
    text: String,
    style: SummaryStyle,
) -> Result<SummarizeResponse, TaskError> {
    validate_text(&text)?;

    let serviced = services.summarizer.summarize(&text, style).await;
    if let Some(reason) = serviced.reason() {
        tracing::info!("Served {} summary from local fallback: {}", style, reason);
    }
    let fallback = serviced.is_fallback();

    Ok(SummarizeResponse {
        original_text: text,
        summary_text: serviced.into_value(),
        style,
        fallback,
    })
}
