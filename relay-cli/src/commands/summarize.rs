//! Summarize command handler

use anyhow::Result;
use colored::*;
use relay_core::domain::task::SummaryStyle;
use relay_core::dto::summary::SummarizeRequest;

use crate::config::Config;

pub async fn summarize(config: &Config, text: String, style: SummaryStyle) -> Result<()> {
    let response = config
        .client()
        .summarize(&SummarizeRequest { text, style })
        .await?;

    println!("{}", format!("Summary ({}):", response.style).bold());
    println!("{}", response.summary_text);

    if response.fallback {
        println!();
        println!(
            "{}",
            "⚠ Inference service unavailable, summary derived locally".yellow()
        );
    }

    Ok(())
}
