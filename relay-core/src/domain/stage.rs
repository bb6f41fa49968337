//! Stage domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical stages a pipeline can be assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Transform,
    Summarize,
    Capture,
    Extract,
    Specify,
    Synthesize,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Transform => "transform",
            StageName::Summarize => "summarize",
            StageName::Capture => "capture",
            StageName::Extract => "extract",
            StageName::Specify => "specify",
            StageName::Synthesize => "synthesize",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage of a task's pipeline
///
/// Produced once by the orchestrator and appended to the task; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageName,
    pub success: bool,
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Set when the payload is a locally computed substitute
    #[serde(default)]
    pub fallback: bool,
    pub elapsed_ms: u64,
}

impl StageResult {
    pub fn succeeded(stage: StageName, payload: serde_json::Value, elapsed_ms: u64) -> Self {
        Self {
            stage,
            success: true,
            payload: Some(payload),
            error: None,
            fallback: false,
            elapsed_ms,
        }
    }

    pub fn failed(stage: StageName, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            stage,
            success: false,
            payload: None,
            error: Some(error.into()),
            fallback: false,
            elapsed_ms,
        }
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }
}
