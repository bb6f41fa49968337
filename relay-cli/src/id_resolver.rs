//! ID resolver module
//!
//! Resolves task ID prefixes to full UUIDs by listing tasks, so users can
//! type a short, unambiguous prefix instead of a full UUID.

use anyhow::{Context, Result, anyhow};
use relay_client::OrchestratorClient;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a task ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, fetches all tasks and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if no task or more than one task matches the prefix,
/// or if the listing fails.
pub async fn resolve_task_id(client: &OrchestratorClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    let prefix = match id_or_prefix {
        IdOrPrefix::Full(uuid) => return Ok(*uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let tasks = client
        .list_tasks()
        .await
        .context("Failed to fetch tasks for ID resolution")?;

    match_prefix(tasks.iter().map(|t| t.id), prefix)
}

fn match_prefix(ids: impl Iterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    let prefix = prefix.to_lowercase();
    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No task found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple tasks: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<Uuid> {
        [
            "3f2a0c1e-0000-4000-8000-000000000001",
            "3f2b9d4c-0000-4000-8000-000000000002",
            "a1b2c3d4-0000-4000-8000-000000000003",
        ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect()
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let id = match_prefix(ids().into_iter(), "A1B2").unwrap();
        assert_eq!(id.to_string(), "a1b2c3d4-0000-4000-8000-000000000003");
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates() {
        let err = match_prefix(ids().into_iter(), "3f2").unwrap_err().to_string();
        assert!(err.contains("Ambiguous"));
        assert!(err.contains("3f2a0c1e"));
        assert!(err.contains("3f2b9d4c"));
    }

    #[test]
    fn test_unknown_prefix() {
        let err = match_prefix(ids().into_iter(), "ffff").unwrap_err().to_string();
        assert!(err.contains("No task found"));
    }
}
