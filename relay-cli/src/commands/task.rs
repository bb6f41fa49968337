//! Task command handlers
//!
//! Starting tasks of every kind, inspecting and waiting for them, and saving
//! the artifacts a finished task produced.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use relay_client::OrchestratorClient;
use relay_core::domain::stage::StageResult;
use relay_core::domain::task::{SummaryStyle, TaskStatus};
use relay_core::dto::task::{StartTask, TaskSummary, TaskView};
use serde_json::Value;

use crate::config::Config;
use crate::id_resolver::resolve_task_id;
use crate::types::IdOrPrefix;

/// Payload keys too large to print inline
const ELIDED_KEYS: &[&str] = &["image_base64"];

/// Task subcommands
#[derive(Subcommand)]
pub enum TaskCommands {
    /// Start a new task
    Start {
        /// Wait for the task to finish and print the outcome
        #[arg(short, long)]
        wait: bool,

        #[command(subcommand)]
        input: StartCommands,
    },
    /// List all tasks
    List,
    /// Get task details
    Get {
        /// Task ID or unambiguous prefix
        id: String,
    },
    /// Poll a task until it completes or fails
    Wait {
        /// Task ID or unambiguous prefix
        id: String,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
    },
    /// Save the artifacts of a completed task
    Artifacts {
        /// Task ID or unambiguous prefix
        id: String,

        /// Directory to write the files to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

/// Task kinds that can be started
#[derive(Subcommand)]
pub enum StartCommands {
    /// Reverse a text
    Reverse {
        text: String,
    },
    /// Summarize a text
    Summarize {
        text: String,

        /// Summary style (concise or detailed)
        #[arg(short, long, default_value = "concise")]
        style: SummaryStyle,
    },
    /// Capture a screenshot of a page
    Screenshot {
        url: String,
    },
    /// Analyse a page and generate a site skeleton from it
    Website {
        url: String,
    },
}

impl From<StartCommands> for StartTask {
    fn from(command: StartCommands) -> Self {
        match command {
            StartCommands::Reverse { text } => StartTask::Reverse { text },
            StartCommands::Summarize { text, style } => StartTask::Summarize { text, style },
            StartCommands::Screenshot { url } => StartTask::Screenshot { url },
            StartCommands::Website { url } => StartTask::Website { url },
        }
    }
}

/// Handle task commands
pub async fn handle_task_command(command: TaskCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        TaskCommands::Start { wait, input } => start_task(&client, input.into(), wait).await,
        TaskCommands::List => list_tasks(&client).await,
        TaskCommands::Get { id } => get_task(&client, &id).await,
        TaskCommands::Wait {
            id,
            interval_ms,
            timeout_secs,
        } => {
            wait_task(
                &client,
                &id,
                Duration::from_millis(interval_ms),
                Duration::from_secs(timeout_secs),
            )
            .await
        }
        TaskCommands::Artifacts { id, output_dir } => {
            save_artifacts(&client, &id, output_dir).await
        }
    }
}

async fn start_task(client: &OrchestratorClient, input: StartTask, wait: bool) -> Result<()> {
    let task = client.start_task(&input).await?;

    println!("{}", "✓ Task started".green().bold());
    println!("  ID:     {}", task.task_id.to_string().cyan());
    println!("  Kind:   {}", task.kind());
    println!("  Status: {}", colorize_status(task.status));

    if wait {
        println!();
        let task = client
            .wait_for_task(task.task_id, Duration::from_millis(500), Duration::from_secs(300))
            .await?;
        print_task_details(&task);
    }

    Ok(())
}

async fn list_tasks(client: &OrchestratorClient) -> Result<()> {
    let tasks = client.list_tasks().await?;

    if tasks.is_empty() {
        println!("{}", "No tasks found.".yellow());
    } else {
        println!("{}", format!("Found {} task(s):", tasks.len()).bold());
        println!();
        for task in tasks {
            print_task_summary(&task);
        }
    }

    Ok(())
}

async fn get_task(client: &OrchestratorClient, id: &str) -> Result<()> {
    let uuid = resolve_task_id(client, &IdOrPrefix::parse(id)).await?;
    let task = client.get_task(uuid).await?;

    print_task_details(&task);

    Ok(())
}

async fn wait_task(
    client: &OrchestratorClient,
    id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let uuid = resolve_task_id(client, &IdOrPrefix::parse(id)).await?;

    println!("{}", format!("Waiting for task {}...", uuid).dimmed());
    let task = client.wait_for_task(uuid, interval, timeout).await?;

    print_task_details(&task);

    Ok(())
}

async fn save_artifacts(client: &OrchestratorClient, id: &str, output_dir: PathBuf) -> Result<()> {
    let uuid = resolve_task_id(client, &IdOrPrefix::parse(id)).await?;
    let bundle = client.get_artifacts(uuid).await?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for (name, content) in &bundle.files {
        let path = output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  {} {} ({} bytes)", "▸".cyan(), path.display(), content.len());
    }

    println!(
        "{}",
        format!("✓ Saved {} artifact(s)", bundle.files.len()).green().bold()
    );

    Ok(())
}

/// Print a one-entry summary for task listings
fn print_task_summary(task: &TaskSummary) {
    println!("  {} Task {}", "▸".cyan(), task.id.to_string().dimmed());
    println!("    Kind:    {}", task.kind);
    println!("    Status:  {}", colorize_status(task.status));
    println!("    Stages:  {}", task.stages_recorded);
    println!(
        "    Created: {}",
        task.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed task information
fn print_task_details(task: &TaskView) {
    println!("{}", "Task Details:".bold());
    println!("  ID:        {}", task.task_id.to_string().cyan());
    println!("  Kind:      {}", task.kind());
    println!("  Status:    {}", colorize_status(task.status));
    println!("  Created:   {}", task.created_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(started) = task.started_at {
        println!("  Started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(completed) = task.completed_at {
        println!("  Completed: {}", completed.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = task.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:  {}ms", duration.num_milliseconds());
        }
    }

    if !task.stages.is_empty() {
        println!("\n{}", "Stages:".bold());
        for stage in &task.stages {
            print_stage(stage);
        }
    }

    if let Some(result) = &task.result {
        println!("\n{}", "Result:".bold());
        if result.degraded {
            println!("  {}", "degraded".yellow());
        }
        if !result.artifacts.is_empty() {
            let names: Vec<&str> = result.artifacts.keys().map(String::as_str).collect();
            println!("  Artifacts: {}", names.join(", "));
        }

        println!("\n{}", "Output:".bold());
        let output = elide(result.output.clone());
        match serde_json::to_string_pretty(&output) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{:?}", output),
        }
    }

    if let Some(error) = &task.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

fn print_stage(stage: &StageResult) {
    let mark = if stage.success {
        "✓".green()
    } else {
        "✗".red()
    };
    let fallback = if stage.fallback {
        " (fallback)".yellow().to_string()
    } else {
        String::new()
    };

    println!(
        "  {} {:<11} {}{}",
        mark,
        stage.stage.as_str(),
        format!("{}ms", stage.elapsed_ms).dimmed(),
        fallback
    );
    if let Some(error) = &stage.error {
        println!("      {}", error.red());
    }
}

/// Replace bulky payload values with a size marker
fn elide(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| match value {
                    Value::String(s) if ELIDED_KEYS.contains(&key.as_str()) => {
                        (key, Value::String(format!("<{} chars>", s.len())))
                    }
                    other => (key, elide(other)),
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(elide).collect()),
        other => other,
    }
}

/// Colorize task status for display
fn colorize_status(status: TaskStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        TaskStatus::Pending => status_str.yellow(),
        TaskStatus::Running => status_str.cyan(),
        TaskStatus::Completed => status_str.green(),
        TaskStatus::Failed => status_str.red(),
    }
}
