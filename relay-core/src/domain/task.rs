//! Task domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::stage::{StageName, StageResult};

/// A unit of client-requested background work
///
/// Owned by the orchestrator's task registry for the lifetime of the process.
/// Clients only ever see snapshots of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub input: TaskInput,
    pub stages: Vec<StageResult>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Task {
    /// Creates a fresh `Pending` task for the given input
    pub fn new(input: TaskInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: input.kind(),
            status: TaskStatus::Pending,
            input,
            stages: Vec::new(),
            result: None,
            error: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Looks up the recorded result of a stage
    pub fn stage(&self, name: StageName) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == name)
    }
}

/// Task lifecycle status
///
/// `Pending -> Running -> {Completed, Failed}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Which operation a task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Reverse a string through the durable workflow runner
    Reverse,
    /// Summarize a text with the hosted inference service
    Summarize,
    /// Capture a screenshot of a remote page
    Screenshot,
    /// Capture, analyse and re-synthesize a remote web page
    Website,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Reverse,
        TaskKind::Summarize,
        TaskKind::Screenshot,
        TaskKind::Website,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Reverse => "reverse",
            TaskKind::Summarize => "summarize",
            TaskKind::Screenshot => "screenshot",
            TaskKind::Website => "website",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown task kind '{s}'"))
    }
}

/// Length of summary requested from the summarizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Concise,
    Detailed,
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryStyle::Concise => write!(f, "concise"),
            SummaryStyle::Detailed => write!(f, "detailed"),
        }
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concise" => Ok(SummaryStyle::Concise),
            "detailed" => Ok(SummaryStyle::Detailed),
            other => Err(format!("unknown summary style '{other}'")),
        }
    }
}

/// Immutable snapshot of the request that created a task
///
/// Tagged by `kind` on the wire, e.g. `{"kind": "reverse", "text": "hello"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskInput {
    Reverse {
        text: String,
    },
    Summarize {
        text: String,
        #[serde(default)]
        style: SummaryStyle,
    },
    Screenshot {
        url: String,
    },
    Website {
        url: String,
    },
}

impl TaskInput {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskInput::Reverse { .. } => TaskKind::Reverse,
            TaskInput::Summarize { .. } => TaskKind::Summarize,
            TaskInput::Screenshot { .. } => TaskKind::Screenshot,
            TaskInput::Website { .. } => TaskKind::Website,
        }
    }

    /// The text payload, for kinds that carry one
    pub fn text(&self) -> Option<&str> {
        match self {
            TaskInput::Reverse { text } | TaskInput::Summarize { text, .. } => Some(text),
            TaskInput::Screenshot { .. } | TaskInput::Website { .. } => None,
        }
    }

    /// The remote resource, for kinds that target one
    pub fn url(&self) -> Option<&str> {
        match self {
            TaskInput::Screenshot { url } | TaskInput::Website { url } => Some(url),
            TaskInput::Reverse { .. } | TaskInput::Summarize { .. } => None,
        }
    }
}

/// Aggregated outcome of a completed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Payload of a single-stage pipeline, or an object keyed by stage name
    pub output: serde_json::Value,
    /// Named text artifacts (e.g. generated source files)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, String>,
    /// True when an optional stage failed or a stage answered with a fallback
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_stages: Vec<StageName>,
}
