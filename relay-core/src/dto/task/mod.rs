//! Task DTOs for the poll and artifact contracts

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::stage::StageResult;
use crate::domain::task::{Task, TaskKind, TaskResult, TaskStatus};

pub use crate::domain::task::TaskInput as StartTask;

/// Poll response for a single task
///
/// The original input is echoed back flattened (`kind` plus its fields).
/// `result` is only present once the task completed, `error` only once it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub task_id: Uuid,
    pub status: TaskStatus,
    #[serde(flatten)]
    pub input: StartTask,
    #[serde(default)]
    pub stages: Vec<StageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TaskView {
    pub fn kind(&self) -> TaskKind {
        self.input.kind()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        let result = match task.status {
            TaskStatus::Completed => task.result,
            _ => None,
        };
        let error = match task.status {
            TaskStatus::Failed => task.error,
            _ => None,
        };

        Self {
            task_id: task.id,
            status: task.status,
            input: task.input,
            stages: task.stages,
            result,
            error,
            created_at: task.created_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}

/// Lightweight task summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub stages_recorded: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Task> for TaskSummary {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            kind: task.kind,
            status: task.status,
            stages_recorded: task.stages.len(),
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}

/// Text artifacts produced by a completed task, keyed by filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub task_id: Uuid,
    pub files: BTreeMap<String, String>,
}
