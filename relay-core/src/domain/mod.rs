//! Core domain types
//!
//! This module contains the core domain structures used across Relay crates.
//! These types are owned by the orchestrator (task registry, pipelines) and
//! read by the client and CLI through the poll interface.

pub mod pipeline;
pub mod stage;
pub mod task;
