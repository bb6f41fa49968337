//! Pipeline domain types

use serde::{Deserialize, Serialize};

use crate::domain::stage::StageName;
use crate::domain::task::TaskKind;

/// Whether a stage failure aborts the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePolicy {
    /// Failure marks the whole task as failed
    Required,
    /// Failure is recorded and the pipeline continues
    Optional,
}

/// A stage slot inside a pipeline definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: StageName,
    pub policy: StagePolicy,
}

impl StageSpec {
    pub const fn required(name: StageName) -> Self {
        Self {
            name,
            policy: StagePolicy::Required,
        }
    }

    pub const fn optional(name: StageName) -> Self {
        Self {
            name,
            policy: StagePolicy::Optional,
        }
    }

    pub fn is_required(&self) -> bool {
        self.policy == StagePolicy::Required
    }
}

/// Static, ordered list of stages run for a task kind
///
/// Definitions are not persisted per task; they are looked up by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub kind: TaskKind,
    pub stages: Vec<StageSpec>,
}

impl PipelineDefinition {
    pub fn new(kind: TaskKind, stages: Vec<StageSpec>) -> Self {
        Self { kind, stages }
    }

    /// The built-in definition for a task kind
    pub fn for_kind(kind: TaskKind) -> Self {
        let stages = match kind {
            TaskKind::Reverse => vec![StageSpec::required(StageName::Transform)],
            TaskKind::Summarize => vec![StageSpec::required(StageName::Summarize)],
            TaskKind::Screenshot => vec![StageSpec::required(StageName::Capture)],
            TaskKind::Website => vec![
                StageSpec::required(StageName::Capture),
                StageSpec::optional(StageName::Extract),
                StageSpec::required(StageName::Specify),
                StageSpec::required(StageName::Synthesize),
            ],
        };

        Self::new(kind, stages)
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name).collect()
    }

    pub fn is_single_stage(&self) -> bool {
        self.stages.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_definition() {
        for kind in TaskKind::ALL {
            let definition = PipelineDefinition::for_kind(kind);
            assert_eq!(definition.kind, kind);
            assert!(!definition.stages.is_empty());
        }
    }

    #[test]
    fn test_website_pipeline_order_and_policy() {
        let definition = PipelineDefinition::for_kind(TaskKind::Website);
        assert_eq!(
            definition.stage_names(),
            vec![
                StageName::Capture,
                StageName::Extract,
                StageName::Specify,
                StageName::Synthesize
            ]
        );
        assert!(definition.stages[0].is_required());
        assert!(!definition.stages[1].is_required());
        assert!(!definition.is_single_stage());
    }

    #[test]
    fn test_reverse_is_single_stage() {
        let definition = PipelineDefinition::for_kind(TaskKind::Reverse);
        assert!(definition.is_single_stage());
        assert_eq!(definition.stages[0], StageSpec::required(StageName::Transform));
    }
}
