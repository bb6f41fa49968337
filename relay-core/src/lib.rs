//! Relay Core
//!
//! Core types and abstractions for the Relay task orchestration service.
//!
//! This crate contains:
//! - Domain types: Core business entities (Task, StageResult, PipelineDefinition)
//! - DTOs: Data transfer objects exchanged between the orchestrator and its clients

pub mod domain;
pub mod dto;
