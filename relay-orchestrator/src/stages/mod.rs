//! Stage adapters
//!
//! A stage wraps one external capability (or a local computation) and turns
//! it into a [`StageResult`]. Stages never fail the orchestrator: every error
//! is captured by [`run_stage`] and recorded on the task.

pub mod capture;
pub mod extract;
pub mod html;
pub mod specify;
pub mod summarize;
pub mod synthesize;
pub mod transform;

use async_trait::async_trait;
use relay_core::domain::stage::{StageName, StageResult};
use relay_core::domain::task::TaskInput;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::external::fetch::{Document, PageFetcher};
use crate::resilience::{CallError, RetryPolicy};

pub use capture::CaptureStage;
pub use extract::ExtractStage;
pub use specify::SpecifyStage;
pub use summarize::SummarizeStage;
pub use synthesize::SynthesizeStage;
pub use transform::TransformStage;

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error("missing output of required stage '{0}'")]
    MissingDependency(StageName),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Processing(String),
}

/// Successful stage output before it is recorded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    pub payload: Value,
    /// The payload is a local substitute for the real capability
    pub fallback: bool,
    /// Text files contributed to the task result
    pub artifacts: BTreeMap<String, String>,
}

impl StageOutput {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_artifacts(mut self, artifacts: BTreeMap<String, String>) -> Self {
        self.artifacts = artifacts;
        self
    }
}

/// Wait before fetching a document again after a transient answer
pub const FETCH_BACKOFF: Duration = Duration::from_millis(500);

/// Default bound on a single document fetch
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a stage may read while it runs
pub struct StageContext {
    task_id: Uuid,
    input: TaskInput,
    outputs: HashMap<StageName, Value>,
    fetcher: Arc<dyn PageFetcher>,
    fetch_policy: RetryPolicy,
    document: OnceCell<Result<Arc<Document>, CallError>>,
}

impl StageContext {
    pub fn new(task_id: Uuid, input: TaskInput, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            task_id,
            input,
            outputs: HashMap::new(),
            fetcher,
            fetch_policy: RetryPolicy::new(FETCH_TIMEOUT, FETCH_BACKOFF),
            document: OnceCell::new(),
        }
    }

    pub fn with_fetch_policy(mut self, policy: RetryPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn input(&self) -> &TaskInput {
        &self.input
    }

    /// Payload of an earlier successful stage
    pub fn output(&self, stage: StageName) -> Option<&Value> {
        self.outputs.get(&stage)
    }

    pub fn require_output(&self, stage: StageName) -> Result<&Value, StageError> {
        self.output(stage)
            .ok_or(StageError::MissingDependency(stage))
    }

    pub fn record_output(&mut self, stage: StageName, payload: Value) {
        self.outputs.insert(stage, payload);
    }

    pub fn has_output(&self, stage: StageName) -> bool {
        self.outputs.contains_key(&stage)
    }

    pub fn url(&self) -> Result<&str, StageError> {
        self.input
            .url()
            .ok_or_else(|| StageError::InvalidInput(format!("{} task has no url", self.input.kind())))
    }

    pub fn text(&self) -> Result<&str, StageError> {
        self.input
            .text()
            .ok_or_else(|| StageError::InvalidInput(format!("{} task has no text", self.input.kind())))
    }

    /// The remote document for URL tasks, fetched once and shared by all stages
    pub async fn document(&self) -> Result<Arc<Document>, StageError> {
        let url = self.url()?;
        let fetched = self
            .document
            .get_or_init(|| async {
                debug!("Fetching {} for task {}", url, self.task_id);
                self.fetch_policy
                    .call("Document fetch", || self.fetcher.fetch(url))
                    .await
                    .map(Arc::new)
            })
            .await;

        fetched.clone().map_err(StageError::from)
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    /// Stages whose successful output this stage reads
    fn requires(&self) -> &'static [StageName] {
        &[]
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, StageError>;
}

/// A recorded stage outcome plus the artifacts it contributed
#[derive(Debug, Clone)]
pub struct StageRun {
    pub result: StageResult,
    pub artifacts: BTreeMap<String, String>,
}

/// Runs a stage, timing it and converting any error into a failed result
pub async fn run_stage(stage: &dyn Stage, ctx: &StageContext) -> StageRun {
    let name = stage.name();
    let started = Instant::now();
    let outcome = stage.execute(ctx).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(output) => {
            debug!("Stage {} succeeded in {}ms", name, elapsed_ms);
            StageRun {
                result: StageResult::succeeded(name, output.payload, elapsed_ms)
                    .with_fallback(output.fallback),
                artifacts: output.artifacts,
            }
        }
        Err(e) => {
            warn!("Stage {} failed after {}ms: {}", name, elapsed_ms, e);
            StageRun {
                result: StageResult::failed(name, e.to_string(), elapsed_ms),
                artifacts: BTreeMap::new(),
            }
        }
    }
}
