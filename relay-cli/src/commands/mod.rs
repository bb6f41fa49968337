//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod health;
mod summarize;
mod task;

pub use task::TaskCommands;

use anyhow::Result;
use clap::Subcommand;
use relay_core::domain::task::SummaryStyle;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Summarize a text right away, without creating a task
    Summarize {
        /// Text to summarize
        text: String,

        /// Summary style (concise or detailed)
        #[arg(short, long, default_value = "concise")]
        style: SummaryStyle,
    },
    /// Show orchestrator and external service health
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Task { command } => task::handle_task_command(command, config).await,
        Commands::Summarize { text, style } => summarize::summarize(config, text, style).await,
        Commands::Health => health::show_health(config).await,
    }
}
