//! Task, summarization and health endpoints

use std::time::Duration;

use crate::OrchestratorClient;
use crate::error::{ClientError, Result};
use relay_core::dto::health::HealthReport;
use relay_core::dto::summary::{SummarizeRequest, SummarizeResponse};
use relay_core::dto::task::{ArtifactBundle, StartTask, TaskSummary, TaskView};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Tasks
    // =============================================================================

    /// Submit a new task
    ///
    /// The orchestrator answers right away with the `running` snapshot; use
    /// [`get_task`](Self::get_task) or [`wait_for_task`](Self::wait_for_task)
    /// to follow it.
    pub async fn start_task(&self, req: &StartTask) -> Result<TaskView> {
        let url = format!("{}/tasks", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get a task by ID
    pub async fn get_task(&self, task_id: Uuid) -> Result<TaskView> {
        let url = format!("{}/tasks/{}", self.base_url, task_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all tasks, newest first
    pub async fn list_tasks(&self) -> Result<Vec<TaskSummary>> {
        let url = format!("{}/tasks", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Text artifacts of a completed task
    pub async fn get_artifacts(&self, task_id: Uuid) -> Result<ArtifactBundle> {
        let url = format!("{}/tasks/{}/artifacts", self.base_url, task_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Poll a task every `interval` until it completes or fails
    ///
    /// Returns [`ClientError::Timeout`] if it is still running after `timeout`.
    pub async fn wait_for_task(
        &self,
        task_id: Uuid,
        interval: Duration,
        timeout: Duration,
    ) -> Result<TaskView> {
        let poll = async {
            loop {
                let task = self.get_task(task_id).await?;
                if task.is_terminal() {
                    return Ok::<_, ClientError>(task);
                }
                tracing::debug!("Task {} is {}, polling again", task_id, task.status);
                tokio::time::sleep(interval).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ClientError::Timeout(task_id))?
    }

    // =============================================================================
    // Summarization and health
    // =============================================================================

    /// Summarize a text synchronously, without creating a task
    pub async fn summarize(&self, req: &SummarizeRequest) -> Result<SummarizeResponse> {
        let url = format!("{}/summarize", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Health of the orchestrator and its external services
    pub async fn health(&self) -> Result<HealthReport> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
