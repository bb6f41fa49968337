//! Data Transfer Objects for the Relay HTTP interface
//!
//! This module contains DTOs exchanged between the orchestrator API and its
//! clients (relay-client, relay-cli). DTOs are flattened, transport-friendly
//! views of the domain entities.

pub mod health;
pub mod summary;
pub mod task;
