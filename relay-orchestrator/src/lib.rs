//! Relay Orchestrator
//!
//! Accepts tasks over HTTP, runs each through the stage pipeline of its kind
//! and keeps every task in an in-process registry for polling.

pub mod api;
pub mod config;
pub mod external;
pub mod pipeline;
pub mod repository;
pub mod resilience;
pub mod service;
pub mod stages;
