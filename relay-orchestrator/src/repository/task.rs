//! Task Repository
//!
//! Owns task records and enforces the task status machine:
//! `pending -> running -> {completed, failed}`.
//!
//! Every operation is atomic per task. Readers always get a full snapshot, so a
//! poll can never observe a half-written stage result or a second finalization.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::domain::stage::StageResult;
use relay_core::domain::task::{Task, TaskInput, TaskResult, TaskStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use thiserror::Error;
use uuid::Uuid;

/// Registry error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Task {0} not found")]
    NotFound(Uuid),

    /// Programming error: the requested transition is not allowed from `from`
    #[error("Cannot {operation} task {id} in state {from}")]
    InvalidTransition {
        id: Uuid,
        from: TaskStatus,
        operation: &'static str,
    },
}

/// Store of task records
///
/// Injected into the service and the pipeline orchestrator so that another
/// backend can replace the in-memory one without touching either.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new `Pending` task and returns it
    async fn create(&self, input: TaskInput) -> Result<Task, RegistryError>;

    /// `Pending -> Running`
    async fn begin(&self, id: Uuid) -> Result<Task, RegistryError>;

    /// Appends a stage result without touching the status
    async fn record_stage(&self, id: Uuid, result: StageResult) -> Result<(), RegistryError>;

    /// Enters `Completed`
    async fn complete(&self, id: Uuid, result: TaskResult) -> Result<Task, RegistryError>;

    /// Enters `Failed`
    async fn fail(&self, id: Uuid, error: String) -> Result<Task, RegistryError>;

    /// Snapshot of the current state of a task
    async fn get(&self, id: Uuid) -> Result<Task, RegistryError>;

    /// Snapshots of all tasks, newest first
    async fn list(&self) -> Result<Vec<Task>, RegistryError>;

    /// Removes terminal tasks that completed before `cutoff`
    async fn evict_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize, RegistryError>;
}

/// In-process task registry
///
/// The outer map lock is only held to find or insert a task; each task has its
/// own lock so pollers of one task never contend with writers of another.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<Uuid, Arc<Mutex<Task>>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: Uuid) -> Result<Arc<Mutex<Task>>, RegistryError> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        tasks.get(&id).cloned().ok_or(RegistryError::NotFound(id))
    }

    /// Applies `update` to a task under its lock and returns the new snapshot
    fn modify<F>(&self, id: Uuid, update: F) -> Result<Task, RegistryError>
    where
        F: FnOnce(&mut Task) -> Result<(), RegistryError>,
    {
        let entry = self.entry(id)?;
        let mut task = lock(&entry);
        update(&mut task)?;
        Ok(task.clone())
    }
}

fn lock(task: &Mutex<Task>) -> MutexGuard<'_, Task> {
    task.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ensure_not_terminal(task: &Task, operation: &'static str) -> Result<(), RegistryError> {
    if task.status.is_terminal() {
        return Err(RegistryError::InvalidTransition {
            id: task.id,
            from: task.status,
            operation,
        });
    }
    Ok(())
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, input: TaskInput) -> Result<Task, RegistryError> {
        let task = Task::new(input);
        let snapshot = task.clone();

        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        tasks.insert(task.id, Arc::new(Mutex::new(task)));

        tracing::debug!("Task created: {} ({})", snapshot.id, snapshot.kind);

        Ok(snapshot)
    }

    async fn begin(&self, id: Uuid) -> Result<Task, RegistryError> {
        self.modify(id, |task| {
            if task.status != TaskStatus::Pending {
                return Err(RegistryError::InvalidTransition {
                    id,
                    from: task.status,
                    operation: "begin",
                });
            }
            task.status = TaskStatus::Running;
            task.started_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn record_stage(&self, id: Uuid, result: StageResult) -> Result<(), RegistryError> {
        self.modify(id, |task| {
            ensure_not_terminal(task, "record a stage for")?;
            task.stages.push(result);
            Ok(())
        })
        .map(|_| ())
    }

    async fn complete(&self, id: Uuid, result: TaskResult) -> Result<Task, RegistryError> {
        self.modify(id, |task| {
            ensure_not_terminal(task, "complete")?;
            task.status = TaskStatus::Completed;
            task.result = Some(result);
            task.error = None;
            task.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn fail(&self, id: Uuid, error: String) -> Result<Task, RegistryError> {
        self.modify(id, |task| {
            ensure_not_terminal(task, "fail")?;
            task.status = TaskStatus::Failed;
            task.result = None;
            task.error = Some(error);
            task.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn get(&self, id: Uuid) -> Result<Task, RegistryError> {
        let entry = self.entry(id)?;
        let task = lock(&entry);
        Ok(task.clone())
    }

    async fn list(&self) -> Result<Vec<Task>, RegistryError> {
        let entries: Vec<_> = {
            let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
            tasks.values().cloned().collect()
        };

        let mut snapshots: Vec<Task> = entries.iter().map(|entry| lock(entry).clone()).collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(snapshots)
    }

    async fn evict_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize, RegistryError> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let before = tasks.len();

        tasks.retain(|_, entry| {
            let task = lock(entry);
            !(task.status.is_terminal() && task.completed_at.is_some_and(|at| at < cutoff))
        });

        Ok(before - tasks.len())
    }
}
