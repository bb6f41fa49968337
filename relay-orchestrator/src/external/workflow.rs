//! Durable workflow engine
//!
//! Workflows are started under a caller-chosen id and their outcome is later
//! collected with [`WorkflowEngine::try_result`], which waits a bounded amount
//! of time and reports `None` while the run is still in progress.
//!
//! [`LocalWorkflowEngine`] executes workflows in-process. Activities share a
//! fixed pool of slots so a burst of tasks cannot run unbounded work at once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, warn};

use crate::resilience::CallError;

/// Largest text accepted by the reverse workflow, in bytes
pub const MAX_TEXT_BYTES: usize = 1024 * 1024;

/// Default number of concurrently executing activities
pub const DEFAULT_MAX_ACTIVITIES: usize = 10;

/// Work that can be submitted to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "workflow", rename_all = "snake_case")]
pub enum WorkflowRequest {
    Reverse { text: String },
}

impl WorkflowRequest {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowRequest::Reverse { .. } => "reverse",
        }
    }
}

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Starts a workflow; ids must be unique
    async fn start(&self, workflow_id: &str, request: WorkflowRequest) -> Result<(), CallError>;

    /// Waits at most `wait` for the outcome, `Ok(None)` while still running
    async fn try_result(
        &self,
        workflow_id: &str,
        wait: Duration,
    ) -> Result<Option<Value>, CallError>;

    /// Drops what the engine keeps for a collected or abandoned run
    async fn release(&self, _workflow_id: &str) {}
}

/// Errors raised by workflow activities
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("input text cannot be empty")]
    EmptyText,

    #[error("input text is {0} bytes, above the 1 MiB limit")]
    TextTooLarge(usize),

    #[error("reversed length {reversed} does not match original length {original}")]
    LengthMismatch { original: usize, reversed: usize },
}

/// Output of the reverse workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseOutcome {
    pub original_text: String,
    pub reversed_text: String,
    pub original_length: usize,
    pub reversed_length: usize,
    pub processing_time_seconds: f64,
    pub workflow_id: String,
}

/// Reverses `text` by Unicode scalar value
pub fn reverse_text(workflow_id: &str, text: &str) -> Result<ReverseOutcome, WorkflowError> {
    let started = Instant::now();

    if text.trim().is_empty() {
        return Err(WorkflowError::EmptyText);
    }
    if text.len() > MAX_TEXT_BYTES {
        return Err(WorkflowError::TextTooLarge(text.len()));
    }

    let reversed_text: String = text.chars().rev().collect();
    let original_length = text.chars().count();
    let reversed_length = reversed_text.chars().count();
    if original_length != reversed_length {
        return Err(WorkflowError::LengthMismatch {
            original: original_length,
            reversed: reversed_length,
        });
    }

    let elapsed = started.elapsed().as_secs_f64();

    Ok(ReverseOutcome {
        original_text: text.to_string(),
        reversed_text,
        original_length,
        reversed_length,
        processing_time_seconds: (elapsed * 1000.0).round() / 1000.0,
        workflow_id: workflow_id.to_string(),
    })
}

type Outcome = Option<Result<Value, String>>;

/// In-process workflow engine with a bounded activity pool
pub struct LocalWorkflowEngine {
    runs: Mutex<HashMap<String, watch::Receiver<Outcome>>>,
    activities: Arc<Semaphore>,
}

impl LocalWorkflowEngine {
    pub fn new(max_activities: usize) -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
            activities: Arc::new(Semaphore::new(max_activities.max(1))),
        }
    }

    /// Activity slots currently free
    pub fn available_activities(&self) -> usize {
        self.activities.available_permits()
    }

    /// Runs started and not yet released
    pub fn tracked_runs(&self) -> usize {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn execute(workflow_id: &str, request: WorkflowRequest) -> Result<Value, String> {
        match request {
            WorkflowRequest::Reverse { text } => reverse_text(workflow_id, &text)
                .map_err(|e| format!("String reversal failed: {}", e))
                .and_then(|outcome| serde_json::to_value(outcome).map_err(|e| e.to_string())),
        }
    }
}

impl Default for LocalWorkflowEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACTIVITIES)
    }
}

#[async_trait]
impl WorkflowEngine for LocalWorkflowEngine {
    async fn start(&self, workflow_id: &str, request: WorkflowRequest) -> Result<(), CallError> {
        let (tx, rx) = watch::channel(None);

        {
            let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
            if runs.contains_key(workflow_id) {
                return Err(CallError::External(format!(
                    "workflow {} already started",
                    workflow_id
                )));
            }
            runs.insert(workflow_id.to_string(), rx);
        }

        info!("Starting {} workflow {}", request.name(), workflow_id);

        let activities = self.activities.clone();
        let workflow_id = workflow_id.to_string();
        tokio::spawn(async move {
            let Ok(_permit) = activities.acquire_owned().await else {
                warn!("Activity pool closed before workflow {} ran", workflow_id);
                return;
            };

            let outcome = LocalWorkflowEngine::execute(&workflow_id, request);
            match &outcome {
                Ok(_) => debug!("Workflow {} finished", workflow_id),
                Err(e) => warn!("Workflow {} failed: {}", workflow_id, e),
            }
            let _ = tx.send(Some(outcome));
        });

        Ok(())
    }

    async fn try_result(
        &self,
        workflow_id: &str,
        wait: Duration,
    ) -> Result<Option<Value>, CallError> {
        let mut rx = self
            .runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| CallError::External(format!("unknown workflow {}", workflow_id)))?;

        let outcome = match tokio::time::timeout(wait, rx.wait_for(Option::is_some)).await {
            Err(_) => return Ok(None),
            Ok(Err(_)) => {
                return Err(CallError::External(format!(
                    "workflow {} stopped without a result",
                    workflow_id
                )));
            }
            Ok(Ok(outcome)) => outcome.clone(),
        };

        match outcome {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(message)) => Err(CallError::External(message)),
            None => Ok(None),
        }
    }

    async fn release(&self, workflow_id: &str) {
        if self
            .runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(workflow_id)
            .is_some()
        {
            debug!("Released workflow {}", workflow_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_done(engine: &LocalWorkflowEngine, id: &str) -> Result<Option<Value>, CallError> {
        engine.try_result(id, Duration::from_secs(2)).await
    }

    #[test]
    fn test_reverse_hello_world() {
        let outcome = reverse_text("wf-1", "hello world").unwrap();
        assert_eq!(outcome.reversed_text, "dlrow olleh");
        assert_eq!(outcome.original_length, 11);
        assert_eq!(outcome.reversed_length, 11);
        assert_eq!(outcome.workflow_id, "wf-1");
    }

    #[test]
    fn test_reverse_counts_characters_not_bytes() {
        let outcome = reverse_text("wf", "héllo ✓").unwrap();
        assert_eq!(outcome.reversed_text, "✓ olléh");
        assert_eq!(outcome.original_length, 7);
    }

    #[test]
    fn test_reverse_rejects_blank_and_oversized() {
        assert_eq!(reverse_text("wf", "   "), Err(WorkflowError::EmptyText));

        let huge = "a".repeat(MAX_TEXT_BYTES + 1);
        assert_eq!(
            reverse_text("wf", &huge),
            Err(WorkflowError::TextTooLarge(MAX_TEXT_BYTES + 1))
        );
    }

    #[tokio::test]
    async fn test_start_then_collect_result() {
        let engine = LocalWorkflowEngine::default();
        engine
            .start("task-1", WorkflowRequest::Reverse { text: "abc".into() })
            .await
            .unwrap();

        let value = wait_done(&engine, "task-1").await.unwrap().unwrap();
        assert_eq!(value["reversed_text"], "cba");
        assert_eq!(value["workflow_id"], "task-1");

        // collecting again yields the same outcome
        let again = wait_done(&engine, "task-1").await.unwrap().unwrap();
        assert_eq!(again, value);
    }

    #[tokio::test]
    async fn test_duplicate_workflow_id_rejected() {
        let engine = LocalWorkflowEngine::default();
        let request = WorkflowRequest::Reverse { text: "abc".into() };

        engine.start("dup", request.clone()).await.unwrap();
        assert!(engine.start("dup", request).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_workflow_surfaces_error() {
        let engine = LocalWorkflowEngine::default();
        engine
            .start("blank", WorkflowRequest::Reverse { text: " ".into() })
            .await
            .unwrap();

        let err = wait_done(&engine, "blank").await.unwrap_err();
        assert!(err.to_string().contains("String reversal failed"));
    }

    #[tokio::test]
    async fn test_released_runs_are_forgotten() {
        let engine = LocalWorkflowEngine::default();
        for i in 0..5 {
            let id = format!("run-{}", i);
            engine
                .start(&id, WorkflowRequest::Reverse { text: "abc".into() })
                .await
                .unwrap();
            wait_done(&engine, &id).await.unwrap().unwrap();
            engine.release(&id).await;
        }

        assert_eq!(engine.tracked_runs(), 0);
        assert!(engine.try_result("run-0", Duration::from_millis(10)).await.is_err());

        // releasing twice is harmless
        engine.release("run-0").await;
    }

    #[tokio::test]
    async fn test_unknown_workflow() {
        let engine = LocalWorkflowEngine::default();
        assert!(engine.try_result("nope", Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_pending_while_no_activity_slot() {
        let engine = LocalWorkflowEngine::new(1);
        let held = engine.activities.clone().acquire_owned().await.unwrap();
        assert_eq!(engine.available_activities(), 0);

        engine
            .start("queued", WorkflowRequest::Reverse { text: "xy".into() })
            .await
            .unwrap();
        assert_eq!(
            engine.try_result("queued", Duration::from_millis(20)).await,
            Ok(None)
        );

        drop(held);
        let value = wait_done(&engine, "queued").await.unwrap().unwrap();
        assert_eq!(value["reversed_text"], "yx");
    }
}
