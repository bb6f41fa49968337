//! Summarization API Handler

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use relay_core::dto::summary::{SummarizeRequest, SummarizeResponse};

use crate::api::error::ApiResult;
use crate::service::{Services, summary_service};

/// POST /summarize
/// Summarize a text synchronously, without creating a task
pub async fn summarize(
    State(services): State<Services>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> ApiResult<Json<SummarizeResponse>> {
    let Json(req) = payload?;
    tracing::debug!("Summarizing {} chars ({})", req.text.len(), req.style);

    let response = summary_service::summarize_now(&services, req.text, req.style).await?;
    Ok(Json(response))
}
