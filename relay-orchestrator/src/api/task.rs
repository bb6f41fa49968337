//! Task API Handlers
//!
//! HTTP endpoints for task creation, polling and artifact retrieval.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
};
use relay_core::dto::task::{ArtifactBundle, StartTask, TaskSummary, TaskView};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::{Services, task_service};

/// POST /tasks
/// Validate and launch a new task
pub async fn start_task(
    State(services): State<Services>,
    payload: Result<Json<StartTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let Json(req) = payload?;
    tracing::info!("Starting {} task", req.kind());

    let task = task_service::start_task(&services, req).await?;

    Ok((StatusCode::ACCEPTED, Json(TaskView::from(task))))
}

/// GET /tasks
/// List all tasks, newest first
pub async fn list_tasks(State(services): State<Services>) -> ApiResult<Json<Vec<TaskSummary>>> {
    tracing::debug!("Listing tasks");

    let tasks = task_service::list_tasks(&services).await?;

    Ok(Json(tasks.into_iter().map(TaskSummary::from).collect()))
}

/// GET /tasks/{id}
/// Poll a task
pub async fn get_task(
    State(services): State<Services>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TaskView>> {
    let Path(id) = id?;
    tracing::debug!("Getting task: {}", id);

    let task = task_service::get_task(&services, id).await?;

    Ok(Json(TaskView::from(task)))
}

/// GET /tasks/{id}/artifacts
/// Files produced by a completed task
pub async fn get_artifacts(
    State(services): State<Services>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ArtifactBundle>> {
    let Path(id) = id?;
    tracing::debug!("Getting artifacts of task: {}", id);

    let bundle = task_service::get_artifacts(&services, id).await?;

    Ok(Json(bundle))
}
