//! Repository Module
//!
//! Data access layer for the orchestrator.
//! The task registry is the single source of truth for task state; the poll
//! interface reads from it and the pipeline orchestrator writes back into it.

pub mod task;

// Re-export for convenience
pub use task as task_repository;
pub use task::{InMemoryTaskRepository, RegistryError, TaskRepository};
