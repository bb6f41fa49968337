//! Task Service
//!
//! Business logic for task creation, polling and artifact retrieval.

use relay_core::domain::task::{Task, TaskInput, TaskStatus};
use relay_core::dto::task::ArtifactBundle;
use reqwest::Url;
use thiserror::Error;
use uuid::Uuid;

use crate::external::workflow::MAX_TEXT_BYTES;
use crate::repository::RegistryError;
use crate::service::Services;

/// Service error type
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(Uuid),

    #[error("Task {id} is {status}, artifacts are only available once it completed")]
    NotCompleted { id: Uuid, status: TaskStatus },

    #[error("Task {0} produced no artifacts")]
    NoArtifacts(Uuid),

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for TaskError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => TaskError::NotFound(id),
            other => TaskError::Registry(other),
        }
    }
}

/// Checks a text payload: present, not blank, at most 1 MiB
pub fn validate_text(text: &str) -> Result<(), TaskError> {
    if text.trim().is_empty() {
        return Err(TaskError::ValidationError("text cannot be empty".to_string()));
    }
    if text.len() > MAX_TEXT_BYTES {
        return Err(TaskError::ValidationError(format!(
            "text is {} bytes, the maximum is {} bytes",
            text.len(),
            MAX_TEXT_BYTES
        )));
    }
    Ok(())
}

/// Checks a URL payload: absolute `http`/`https` with a host
pub fn validate_url(url: &str) -> Result<(), TaskError> {
    if url.trim().is_empty() {
        return Err(TaskError::ValidationError("url cannot be empty".to_string()));
    }

    let parsed = Url::parse(url.trim())
        .map_err(|e| TaskError::ValidationError(format!("invalid url '{}': {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(TaskError::ValidationError(format!(
            "url must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(TaskError::ValidationError(format!("url '{}' has no host", url)));
    }
    Ok(())
}

fn validate(input: &TaskInput) -> Result<(), TaskError> {
    match input {
        TaskInput::Reverse { text } | TaskInput::Summarize { text, .. } => validate_text(text),
        TaskInput::Screenshot { url } | TaskInput::Website { url } => validate_url(url),
    }
}

/// Validate, register and launch a new task
///
/// Returns the `running` snapshot; nothing is created when validation fails.
pub async fn start_task(services: &Services, input: TaskInput) -> Result<Task, TaskError> {
    validate(&input)?;

    let input = match input {
        TaskInput::Screenshot { url } => TaskInput::Screenshot {
            url: url.trim().to_string(),
        },
        TaskInput::Website { url } => TaskInput::Website {
            url: url.trim().to_string(),
        },
        other => other,
    };

    let task = services.repository.create(input.clone()).await?;
    tracing::info!("Task created: {} ({})", task.id, task.kind);

    let running = services.orchestrator.launch(task.id, input).await.map_err(|e| {
        tracing::error!("Failed to launch task {}: {}", task.id, e);
        TaskError::from(e)
    })?;

    Ok(running)
}

/// Get a task by ID
pub async fn get_task(services: &Services, id: Uuid) -> Result<Task, TaskError> {
    Ok(services.repository.get(id).await?)
}

/// List all tasks, newest first
pub async fn list_tasks(services: &Services) -> Result<Vec<Task>, TaskError> {
    Ok(services.repository.list().await?)
}

/// Text artifacts of a completed task
pub async fn get_artifacts(services: &Services, id: Uuid) -> Result<ArtifactBundle, TaskError> {
    let task = services.repository.get(id).await?;

    if task.status != TaskStatus::Completed {
        return Err(TaskError::NotCompleted {
            id,
            status: task.status,
        });
    }

    let files = task
        .result
        .map(|result| result.artifacts)
        .filter(|artifacts| !artifacts.is_empty())
        .ok_or(TaskError::NoArtifacts(id))?;

    Ok(ArtifactBundle { task_id: id, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::offline_services;
    use std::time::Duration;

    async fn wait_terminal(services: &Services, id: Uuid) -> Task {
        for _ in 0..200 {
            let task = get_task(services, id).await.unwrap();
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never finished", id);
    }

    #[test]
    fn test_text_validation() {
        assert!(validate_text("hello").is_ok());
        assert!(validate_text("   \n").is_err());
        assert!(validate_text(&"x".repeat(MAX_TEXT_BYTES)).is_ok());
        assert!(validate_text(&"x".repeat(MAX_TEXT_BYTES + 1)).is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_url("https://example.com/path?q=1").is_ok());
        assert!(validate_url(" http://localhost:3000 ").is_ok());
        assert!(validate_url("").is_err());
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_blank_input_creates_nothing() {
        let services = offline_services();

        let err = start_task(&services, TaskInput::Reverse { text: "  ".into() })
            .await
            .unwrap_err();

        assert!(matches!(err, TaskError::ValidationError(_)));
        assert!(list_tasks(&services).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_returns_running_then_completes() {
        let services = offline_services();

        let task = start_task(&services, TaskInput::Reverse { text: "hello world".into() })
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Running);

        let finished = wait_terminal(&services, task.id).await;
        assert_eq!(finished.status, TaskStatus::Completed);
        assert_eq!(finished.result.unwrap().output["reversed_text"], "dlrow olleh");

        // terminal snapshots are stable
        assert_eq!(get_task(&services, task.id).await.unwrap(), get_task(&services, task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let services = offline_services();
        let id = Uuid::new_v4();

        assert!(matches!(get_task(&services, id).await, Err(TaskError::NotFound(got)) if got == id));
        assert!(matches!(get_artifacts(&services, id).await, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_artifacts_require_completion_and_content() {
        let services = offline_services();

        let pending = services
            .repository
            .create(TaskInput::Reverse { text: "abc".into() })
            .await
            .unwrap();
        assert!(matches!(
            get_artifacts(&services, pending.id).await,
            Err(TaskError::NotCompleted { status: TaskStatus::Pending, .. })
        ));

        let reversed = start_task(&services, TaskInput::Reverse { text: "abc".into() })
            .await
            .unwrap();
        wait_terminal(&services, reversed.id).await;
        assert!(matches!(
            get_artifacts(&services, reversed.id).await,
            Err(TaskError::NoArtifacts(_))
        ));
    }

    #[tokio::test]
    async fn test_screenshot_without_browser_fails_task() {
        let services = offline_services();

        let task = start_task(&services, TaskInput::Screenshot { url: "https://example.com".into() })
            .await
            .unwrap();
        let finished = wait_terminal(&services, task.id).await;

        assert_eq!(finished.status, TaskStatus::Failed);
        assert!(finished.error.unwrap().starts_with("stage 'capture' failed"));
    }
}
