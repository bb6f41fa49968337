//! Resilient summarization
//!
//! Wraps an [`InferenceClient`] with a [`RetryPolicy`] and falls back to a
//! deterministic sentence-picking heuristic when the service cannot answer.

use relay_core::domain::task::SummaryStyle;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::external::inference::InferenceClient;
use crate::resilience::{CallError, RetryPolicy, Serviced};

/// Shorter texts are returned as they are instead of being sent to the model
pub const MIN_SUMMARY_WORDS: usize = 20;

pub struct Summarizer {
    client: Arc<dyn InferenceClient>,
    policy: RetryPolicy,
}

impl Summarizer {
    pub fn new(client: Arc<dyn InferenceClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &Arc<dyn InferenceClient> {
        &self.client
    }

    /// Summarizes `text`, never failing
    pub async fn summarize(&self, text: &str, style: SummaryStyle) -> Serviced<String> {
        let words = text.split_whitespace().count();
        if self.client.is_configured() && words < MIN_SUMMARY_WORDS {
            debug!("Text too short to summarize ({} words), returning it unchanged", words);
            return Serviced::Full(text.to_string());
        }

        let outcome = self
            .policy
            .call("summarize", || self.client.summarize(text, style))
            .await
            .and_then(|summary| usable_summary(text, summary));

        match outcome {
            Ok(summary) => {
                debug!("Inference produced a {} summary ({} chars)", style, summary.len());
                Serviced::Full(summary)
            }
            Err(e) => {
                warn!("Summarization degraded to local fallback: {}", e);
                Serviced::fallback(fallback_summary(text, style), e.to_string())
            }
        }
    }
}

fn usable_summary(text: &str, summary: String) -> Result<String, CallError> {
    let trimmed = summary.trim();
    if trimmed.is_empty() {
        return Err(CallError::external("inference returned an empty summary"));
    }
    if trimmed == text.trim() {
        return Err(CallError::external("inference echoed the input unchanged"));
    }
    Ok(trimmed.to_string())
}

/// Picks representative sentences from `text`
///
/// Texts with at most two sentences are returned unchanged.
pub fn fallback_summary(text: &str, style: SummaryStyle) -> String {
    let sentences: Vec<&str> = text
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.len() <= 2 {
        return text.to_string();
    }

    let last = sentences.len() - 1;
    match style {
        SummaryStyle::Concise => format!("{}. {}.", sentences[0], sentences[last - 1]),
        SummaryStyle::Detailed => format!(
            "{}. {}. {}.",
            sentences[0],
            sentences[sentences.len() / 2],
            sentences[last]
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const ARTICLE: &str = "Rust is a fast systems language. It is memory safe without a garbage collector. \
                           It has great tooling and docs. People like it a lot.";

    struct ScriptedInference {
        replies: Mutex<VecDeque<Result<String, CallError>>>,
        calls: AtomicU32,
    }

    impl ScriptedInference {
        fn new(replies: Vec<Result<String, CallError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedInference {
        async fn summarize(&self, _text: &str, _style: SummaryStyle) -> Result<String, CallError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CallError::external("unreachable")))
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn endpoint(&self) -> String {
            "scripted".to_string()
        }

        async fn probe(&self) -> bool {
            true
        }
    }

    fn summarizer(client: Arc<ScriptedInference>) -> Summarizer {
        Summarizer::new(
            client,
            RetryPolicy::new(Duration::from_millis(200), Duration::from_millis(5)),
        )
    }

    #[test]
    fn test_concise_fallback_picks_first_and_second_to_last() {
        assert_eq!(
            fallback_summary(ARTICLE, SummaryStyle::Concise),
            "Rust is a fast systems language. It has great tooling and docs."
        );
    }

    #[test]
    fn test_detailed_fallback_picks_first_middle_last() {
        assert_eq!(
            fallback_summary(ARTICLE, SummaryStyle::Detailed),
            "Rust is a fast systems language. It has great tooling and docs. People like it a lot."
        );
    }

    #[test]
    fn test_short_text_is_returned_unchanged() {
        let text = "Only one sentence. And another";
        assert_eq!(fallback_summary(text, SummaryStyle::Concise), text);
        assert_eq!(fallback_summary("no dots at all", SummaryStyle::Detailed), "no dots at all");
    }

    #[tokio::test]
    async fn test_warming_up_then_success_is_full() {
        let client = ScriptedInference::new(vec![
            Err(CallError::Transient("model loading".into())),
            Ok("Rust is loved.".into()),
        ]);
        let result = summarizer(client.clone())
            .summarize(ARTICLE, SummaryStyle::Concise)
            .await;

        assert_eq!(result, Serviced::Full("Rust is loved.".to_string()));
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unavailable_after_retry_falls_back() {
        let client = ScriptedInference::new(vec![
            Err(CallError::Transient("model loading".into())),
            Err(CallError::Transient("model loading".into())),
        ]);
        let result = summarizer(client)
            .summarize(ARTICLE, SummaryStyle::Concise)
            .await;

        assert!(result.is_fallback());
        assert_eq!(
            result.value(),
            "Rust is a fast systems language. It has great tooling and docs."
        );
    }

    #[tokio::test]
    async fn test_short_text_skips_the_model() {
        let client = ScriptedInference::new(vec![Ok("never used".into())]);
        let text = "Rust is fast. It is memory safe. It has great tooling. People like it.";

        let result = summarizer(client.clone())
            .summarize(text, SummaryStyle::Concise)
            .await;

        assert_eq!(result, Serviced::Full(text.to_string()));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_echoed_input_falls_back() {
        let client = ScriptedInference::new(vec![Ok(ARTICLE.to_string())]);
        let result = summarizer(client.clone())
            .summarize(ARTICLE, SummaryStyle::Concise)
            .await;

        assert!(result.is_fallback());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back() {
        let client = ScriptedInference::new(vec![Ok("   ".to_string())]);
        let result = summarizer(client)
            .summarize(ARTICLE, SummaryStyle::Detailed)
            .await;

        assert!(result.is_fallback());
        assert!(result.reason().unwrap().contains("empty"));
    }
}
