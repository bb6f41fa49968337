//! Pipeline execution
//!
//! Pipelines are static per task kind (see
//! [`PipelineDefinition`](relay_core::domain::pipeline::PipelineDefinition));
//! the [`StageCatalog`] maps each stage name to the adapter that runs it.

pub mod orchestrator;

use relay_core::domain::stage::StageName;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::external::browser::BrowserService;
use crate::external::workflow::WorkflowEngine;
use crate::resilience::{RetryPolicy, Summarizer};
use crate::stages::{
    CaptureStage, ExtractStage, SpecifyStage, Stage, SummarizeStage, SynthesizeStage,
    TransformStage,
};

pub use orchestrator::PipelineOrchestrator;

/// Stage adapters available to pipelines, by name
#[derive(Clone, Default)]
pub struct StageCatalog {
    stages: HashMap<StageName, Arc<dyn Stage>>,
}

impl StageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stage, replacing any stage with the same name
    pub fn with(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.insert(stage.name(), stage);
        self
    }

    pub fn get(&self, name: StageName) -> Option<&Arc<dyn Stage>> {
        self.stages.get(&name)
    }

    /// The built-in adapters wired to their collaborators
    pub fn standard(
        workflow: Arc<dyn WorkflowEngine>,
        workflow_timeout: Duration,
        summarizer: Arc<Summarizer>,
        browser: Arc<dyn BrowserService>,
        capture_policy: RetryPolicy,
    ) -> Self {
        Self::new()
            .with(Arc::new(TransformStage::new(workflow, workflow_timeout)))
            .with(Arc::new(SummarizeStage::new(summarizer.clone())))
            .with(Arc::new(CaptureStage::new(browser, capture_policy)))
            .with(Arc::new(ExtractStage::new(Some(summarizer))))
            .with(Arc::new(SpecifyStage))
            .with(Arc::new(SynthesizeStage))
    }
}
