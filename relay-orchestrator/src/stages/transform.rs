//! Text transformation through the workflow engine

use async_trait::async_trait;
use relay_core::domain::stage::StageName;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::external::workflow::{WorkflowEngine, WorkflowRequest};
use crate::resilience::CallError;
use crate::stages::{Stage, StageContext, StageError, StageOutput};

/// Longest single wait on the engine before checking again
pub const POLL_BOUND: Duration = Duration::from_millis(100);

/// Starts the reverse workflow under the task id and collects its outcome
pub struct TransformStage {
    engine: Arc<dyn WorkflowEngine>,
    timeout: Duration,
}

impl TransformStage {
    pub fn new(engine: Arc<dyn WorkflowEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }
}

#[async_trait]
impl Stage for TransformStage {
    fn name(&self) -> StageName {
        StageName::Transform
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let text = ctx.text()?.to_string();
        let workflow_id = ctx.task_id().to_string();

        self.engine
            .start(&workflow_id, WorkflowRequest::Reverse { text })
            .await?;

        let collect = async {
            loop {
                if let Some(value) = self.engine.try_result(&workflow_id, POLL_BOUND).await? {
                    return Ok::<_, CallError>(value);
                }
                debug!("Workflow {} still running", workflow_id);
            }
        };

        let collected = tokio::time::timeout(self.timeout, collect)
            .await
            .map_err(|_| CallError::Timeout(self.timeout));
        self.engine.release(&workflow_id).await;

        Ok(StageOutput::new(collected??))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::workflow::LocalWorkflowEngine;
    use crate::stages::run_stage;
    use crate::stages::testing::StaticFetcher;
    use relay_core::domain::task::TaskInput;
    use serde_json::Value;
    use uuid::Uuid;

    /// Accepts every workflow and never finishes it
    struct StuckEngine;

    #[async_trait]
    impl WorkflowEngine for StuckEngine {
        async fn start(&self, _id: &str, _request: WorkflowRequest) -> Result<(), CallError> {
            Ok(())
        }

        async fn try_result(&self, _id: &str, wait: Duration) -> Result<Option<Value>, CallError> {
            tokio::time::sleep(wait).await;
            Ok(None)
        }
    }

    fn context(text: &str) -> StageContext {
        StageContext::new(
            Uuid::new_v4(),
            TaskInput::Reverse { text: text.into() },
            StaticFetcher::html(""),
        )
    }

    #[tokio::test]
    async fn test_reverses_through_engine() {
        let stage = TransformStage::new(Arc::new(LocalWorkflowEngine::default()), Duration::from_secs(2));
        let ctx = context("hello world");

        let output = stage.execute(&ctx).await.unwrap();

        assert_eq!(output.payload["reversed_text"], "dlrow olleh");
        assert_eq!(output.payload["original_length"], 11);
        assert_eq!(output.payload["reversed_length"], 11);
        assert_eq!(output.payload["workflow_id"], ctx.task_id().to_string());
        assert!(!output.fallback);
    }

    #[tokio::test]
    async fn test_engine_keeps_no_runs_after_stage() {
        let engine = Arc::new(LocalWorkflowEngine::default());
        let stage = TransformStage::new(engine.clone(), Duration::from_secs(2));

        for text in ["one", "two", "   "] {
            run_stage(&stage, &context(text)).await;
        }

        assert_eq!(engine.tracked_runs(), 0);
    }

    #[tokio::test]
    async fn test_stuck_workflow_times_out() {
        let stage = TransformStage::new(Arc::new(StuckEngine), Duration::from_millis(250));
        let run = run_stage(&stage, &context("abc")).await;

        assert!(!run.result.success);
        assert!(run.result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_workflow_failure_fails_stage() {
        let stage = TransformStage::new(Arc::new(LocalWorkflowEngine::default()), Duration::from_secs(2));
        let run = run_stage(&stage, &context("   ")).await;

        assert!(!run.result.success);
        assert!(run.result.error.unwrap().contains("cannot be empty"));
    }
}
