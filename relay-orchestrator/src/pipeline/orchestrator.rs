//! Pipeline orchestrator
//!
//! Drives a task through its kind's stages in order, recording every stage
//! result on the task as soon as it is known:
//! - a failed `required` stage fails the task and stops the pipeline
//! - a failed `optional` stage, or one answering with a fallback, leaves the task degraded
//! - a stage whose dependencies did not succeed is recorded as failed without running

use relay_core::domain::pipeline::PipelineDefinition;
use relay_core::domain::stage::{StageName, StageResult};
use relay_core::domain::task::{Task, TaskInput, TaskKind, TaskResult};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::external::fetch::PageFetcher;
use crate::pipeline::StageCatalog;
use crate::repository::{RegistryError, TaskRepository};
use crate::resilience::RetryPolicy;
use crate::stages::{FETCH_BACKOFF, FETCH_TIMEOUT, StageContext, StageError, StageRun, run_stage};

pub struct PipelineOrchestrator {
    repository: Arc<dyn TaskRepository>,
    catalog: StageCatalog,
    fetcher: Arc<dyn PageFetcher>,
    fetch_policy: RetryPolicy,
    definitions: HashMap<TaskKind, PipelineDefinition>,
}

impl PipelineOrchestrator {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        catalog: StageCatalog,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let definitions = TaskKind::ALL
            .into_iter()
            .map(|kind| (kind, PipelineDefinition::for_kind(kind)))
            .collect();

        Self {
            repository,
            catalog,
            fetcher,
            fetch_policy: RetryPolicy::new(FETCH_TIMEOUT, FETCH_BACKOFF),
            definitions,
        }
    }

    /// Policy applied when a stage fetches the task's document
    pub fn with_fetch_policy(mut self, policy: RetryPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Overrides the definition used for one task kind
    pub fn with_definition(mut self, definition: PipelineDefinition) -> Self {
        self.definitions.insert(definition.kind, definition);
        self
    }

    pub fn repository(&self) -> &Arc<dyn TaskRepository> {
        &self.repository
    }

    fn definition(&self, kind: TaskKind) -> PipelineDefinition {
        self.definitions
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| PipelineDefinition::for_kind(kind))
    }

    /// Runs the whole pipeline for a pending task and returns the finished task
    pub async fn run(&self, task_id: Uuid, input: TaskInput) -> Result<Task, RegistryError> {
        self.repository.begin(task_id).await?;
        self.drive(task_id, input).await
    }

    /// Marks the task running, then drives the pipeline in the background
    ///
    /// Returns the `running` snapshot. If the background pipeline panics the
    /// task is failed so pollers never wait forever.
    pub async fn launch(
        self: &Arc<Self>,
        task_id: Uuid,
        input: TaskInput,
    ) -> Result<Task, RegistryError> {
        let task = self.repository.begin(task_id).await?;

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let driver = {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move { orchestrator.drive(task_id, input).await })
            };

            match driver.await {
                Ok(Ok(task)) => debug!("Pipeline for task {} finished as {}", task_id, task.status),
                Ok(Err(e)) => error!("Pipeline for task {} could not record its outcome: {}", task_id, e),
                Err(e) => {
                    error!("Pipeline for task {} aborted: {}", task_id, e);
                    if let Err(e) = orchestrator
                        .repository
                        .fail(task_id, "pipeline aborted unexpectedly".to_string())
                        .await
                    {
                        warn!("Could not fail aborted task {}: {}", task_id, e);
                    }
                }
            }
        });

        Ok(task)
    }

    async fn drive(&self, task_id: Uuid, input: TaskInput) -> Result<Task, RegistryError> {
        let definition = self.definition(input.kind());
        info!(
            "Running {} pipeline for task {} ({} stage(s))",
            definition.kind,
            task_id,
            definition.stages.len()
        );

        let mut ctx = StageContext::new(task_id, input, self.fetcher.clone())
            .with_fetch_policy(self.fetch_policy);
        let mut payloads: Vec<(StageName, Value)> = Vec::new();
        let mut artifacts = BTreeMap::new();
        let mut failed_stages = Vec::new();
        let mut served_fallback = false;

        for spec in &definition.stages {
            let run = self.run_one(spec.name, &ctx).await;
            let StageRun { result, artifacts: produced } = run;

            self.repository.record_stage(task_id, result.clone()).await?;

            if result.success {
                served_fallback |= result.fallback;
                let payload = result.payload.unwrap_or(Value::Null);
                ctx.record_output(spec.name, payload.clone());
                payloads.push((spec.name, payload));
                artifacts.extend(produced);
                continue;
            }

            let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
            if spec.is_required() {
                error!("Required stage {} of task {} failed: {}", spec.name, task_id, reason);
                return self
                    .repository
                    .fail(task_id, format!("stage '{}' failed: {}", spec.name, reason))
                    .await;
            }

            warn!("Optional stage {} of task {} failed: {}", spec.name, task_id, reason);
            failed_stages.push(spec.name);
        }

        let output = if definition.is_single_stage() {
            payloads
                .into_iter()
                .next()
                .map(|(_, payload)| payload)
                .unwrap_or(Value::Null)
        } else {
            let mut by_stage = Map::new();
            for (name, payload) in payloads {
                by_stage.insert(name.to_string(), payload);
            }
            Value::Object(by_stage)
        };

        let result = TaskResult {
            output,
            artifacts,
            degraded: served_fallback || !failed_stages.is_empty(),
            failed_stages,
        };

        let task = self.repository.complete(task_id, result).await?;
        info!(
            "Task {} completed{}",
            task_id,
            if task.result.as_ref().is_some_and(|r| r.degraded) {
                " (degraded)"
            } else {
                ""
            }
        );
        Ok(task)
    }

    async fn run_one(&self, name: StageName, ctx: &StageContext) -> StageRun {
        let Some(stage) = self.catalog.get(name) else {
            return StageRun {
                result: StageResult::failed(name, format!("no adapter registered for stage '{}'", name), 0),
                artifacts: BTreeMap::new(),
            };
        };

        if let Some(missing) = stage.requires().iter().find(|dep| !ctx.has_output(**dep)) {
            return StageRun {
                result: StageResult::failed(
                    name,
                    StageError::MissingDependency(*missing).to_string(),
                    0,
                ),
                artifacts: BTreeMap::new(),
            };
        }

        run_stage(stage.as_ref(), ctx).await
    }
}
