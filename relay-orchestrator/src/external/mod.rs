//! External collaborators
//!
//! Each capability the pipeline depends on sits behind a trait so stages can
//! be exercised against fakes. The HTTP implementations map every response
//! into a [`CallError`](crate::resilience::CallError).

pub mod browser;
pub mod fetch;
pub mod inference;
pub mod workflow;

pub use browser::{BrowserService, HttpBrowserService, PageCapture};
pub use fetch::{Document, HttpPageFetcher, PageFetcher};
pub use inference::{HttpInferenceClient, InferenceClient};
pub use workflow::{LocalWorkflowEngine, WorkflowEngine, WorkflowRequest};
