//! Resilience layer
//!
//! Failure-handling policy applied to every external call made by a stage:
//! - `retry`: bounded retry on the transient "warming up" signal, per-call timeout
//! - `fallback`: tagging of locally computed substitutes
//! - `summarizer`: the inference capability wrapped with both

pub mod fallback;
pub mod retry;
pub mod summarizer;

pub use fallback::Serviced;
pub use retry::{CallError, RetryPolicy};
pub use summarizer::{Summarizer, fallback_summary};
