//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services validate requests and coordinate the registry, the pipeline
//! orchestrator and the external collaborators.

pub mod health;
pub mod summary;
pub mod task;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::external::{
    BrowserService, HttpBrowserService, HttpInferenceClient, HttpPageFetcher, InferenceClient,
    LocalWorkflowEngine, PageFetcher, WorkflowEngine,
};
use crate::pipeline::{PipelineOrchestrator, StageCatalog};
use crate::repository::{InMemoryTaskRepository, TaskRepository};
use crate::resilience::{RetryPolicy, Summarizer};
use crate::stages::FETCH_BACKOFF;

// Re-export for convenience
pub use health as health_service;
pub use summary as summary_service;
pub use task as task_service;
pub use task::TaskError;

/// Wait before retrying a capture the browser service rejected as transient
const CAPTURE_BACKOFF: Duration = Duration::from_secs(2);

/// Shared handles used by every service function
#[derive(Clone)]
pub struct Services {
    pub repository: Arc<dyn TaskRepository>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub summarizer: Arc<Summarizer>,
    pub browser: Arc<dyn BrowserService>,
}

impl Services {
    /// Wire the registry, the clients and the standard stage catalog
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let repository: Arc<dyn TaskRepository> = Arc::new(InMemoryTaskRepository::new());

        let inference: Arc<dyn InferenceClient> =
            Arc::new(HttpInferenceClient::new(&config.inference)?);
        let summarizer = Arc::new(Summarizer::new(
            inference,
            RetryPolicy::new(config.inference.timeout, config.inference.warmup_backoff),
        ));
        let browser: Arc<dyn BrowserService> = Arc::new(HttpBrowserService::new(&config.browser)?);
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(config.fetch_timeout)?);
        let workflow: Arc<dyn WorkflowEngine> =
            Arc::new(LocalWorkflowEngine::new(config.workflow_max_activities));

        let catalog = StageCatalog::standard(
            workflow,
            config.workflow_timeout,
            summarizer.clone(),
            browser.clone(),
            RetryPolicy::new(config.browser.timeout, CAPTURE_BACKOFF),
        );
        let orchestrator = Arc::new(
            PipelineOrchestrator::new(repository.clone(), catalog, fetcher)
                .with_fetch_policy(RetryPolicy::new(config.fetch_timeout, FETCH_BACKOFF)),
        );

        Ok(Self {
            repository,
            orchestrator,
            summarizer,
            browser,
        })
    }
}
