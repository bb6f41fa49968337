//! Text summarization stage

use async_trait::async_trait;
use relay_core::domain::stage::StageName;
use relay_core::domain::task::TaskInput;
use serde_json::json;
use std::sync::Arc;

use crate::resilience::Summarizer;
use crate::stages::{Stage, StageContext, StageError, StageOutput};

pub struct SummarizeStage {
    summarizer: Arc<Summarizer>,
}

impl SummarizeStage {
    pub fn new(summarizer: Arc<Summarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    fn name(&self) -> StageName {
        StageName::Summarize
    }

    async fn execute(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let TaskInput::Summarize { text, style } = ctx.input() else {
            return Err(StageError::InvalidInput(format!(
                "{} task cannot be summarized",
                ctx.input().kind()
            )));
        };

        let serviced = self.summarizer.summarize(text, *style).await;
        let fallback = serviced.is_fallback();
        let mut payload = json!({
            "original_text": text,
            "summary_text": serviced.value(),
            "style": style,
            "original_length": text.chars().count(),
            "summary_length": serviced.value().chars().count(),
        });
        if let Some(reason) = serviced.reason() {
            payload["fallback_reason"] = json!(reason);
        }

        Ok(StageOutput::new(payload).with_fallback(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::inference::InferenceClient;
    use crate::resilience::{CallError, RetryPolicy};
    use crate::stages::testing::StaticFetcher;
    use relay_core::domain::task::SummaryStyle;
    use std::time::Duration;
    use uuid::Uuid;

    const TEXT: &str = "The first point covers setup and installation. The second point explains the core ideas. \
                        The third point walks through a full example. A closing remark wraps everything up.";

    struct Unreachable;

    #[async_trait]
    impl InferenceClient for Unreachable {
        async fn summarize(&self, _text: &str, _style: SummaryStyle) -> Result<String, CallError> {
            Err(CallError::external("connection refused"))
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn endpoint(&self) -> String {
            "unreachable".to_string()
        }

        async fn probe(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_tagged_fallback() {
        let summarizer = Summarizer::new(
            Arc::new(Unreachable),
            RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(1)),
        );
        let stage = SummarizeStage::new(Arc::new(summarizer));
        let ctx = StageContext::new(
            Uuid::new_v4(),
            TaskInput::Summarize {
                text: TEXT.to_string(),
                style: SummaryStyle::Concise,
            },
            StaticFetcher::html(""),
        );

        let output = stage.execute(&ctx).await.unwrap();

        assert!(output.fallback);
        assert_eq!(
            output.payload["summary_text"],
            "The first point covers setup and installation. The third point walks through a full example."
        );
        assert_eq!(output.payload["style"], "concise");
        assert!(output.payload["fallback_reason"]
            .as_str()
            .unwrap()
            .contains("connection refused"));
    }
}
