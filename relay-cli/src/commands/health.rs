//! Health command handler

use anyhow::Result;
use colored::*;
use relay_core::dto::health::ServiceHealth;

use crate::config::Config;

pub async fn show_health(config: &Config) -> Result<()> {
    let report = config.client().health().await?;

    println!("{}", "Orchestrator Health:".bold());
    println!("  App:        {}", report.app.green());
    print_service("Inference", &report.inference);
    print_service("Browser", &report.browser);

    println!("\n{}", "Features:".bold());
    for (name, available) in [
        ("string reversal", report.features.string_reversal),
        ("AI summarization", report.features.ai_summarization),
        ("screenshots", report.features.screenshots),
        ("website synthesis", report.features.website_synthesis),
    ] {
        let mark = if available { "✓".green() } else { "✗".red() };
        println!("  {} {}", mark, name);
    }

    Ok(())
}

fn print_service(label: &str, health: &ServiceHealth) {
    let status = match health.status.as_str() {
        "connected" | "configured" => health.status.green(),
        "not configured" => health.status.dimmed(),
        _ => health.status.yellow(),
    };
    println!("  {:<11} {} ({})", format!("{}:", label), status, health.endpoint.dimmed());
}
