use std::sync::Arc;
use std::time::Duration;

use relay_orchestrator::api;
use relay_orchestrator::config::{Config, retention_cutoff};
use relay_orchestrator::repository::TaskRepository;
use relay_orchestrator::service::Services;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Relay Orchestrator...");

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!(
        "Inference: {} ({})",
        config.inference.model,
        if config.inference.api_token.is_some() {
            "token configured"
        } else {
            "no token, summaries use the local fallback"
        }
    );
    if !config.browser.is_configured() {
        tracing::warn!("Browser service not configured, screenshot and website tasks will fail");
    }

    let services = Services::from_config(&config)?;

    if let Some(retention) = config.task_retention {
        spawn_retention_sweeper(
            services.repository.clone(),
            retention,
            config.retention_sweep_interval,
        );
    }

    // Build router with all API endpoints
    let app = api::create_router(services, &config.cors_allowed_origins);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Relay Orchestrator stopped");
    Ok(())
}

/// Periodically evicts terminal tasks older than `retention`
fn spawn_retention_sweeper(
    repository: Arc<dyn TaskRepository>,
    retention: Duration,
    every: Duration,
) {
    tracing::info!(
        "Evicting terminal tasks after {}s (sweep every {}s)",
        retention.as_secs(),
        every.as_secs()
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;

            let Some(cutoff) = retention_cutoff(chrono::Utc::now(), retention) else {
                tracing::error!(
                    "Retention period of {}s is out of range, sweep skipped",
                    retention.as_secs()
                );
                continue;
            };
            match repository.evict_terminal_before(cutoff).await {
                Ok(0) => {}
                Ok(evicted) => tracing::info!("Evicted {} expired tasks", evicted),
                Err(e) => tracing::error!("Retention sweep failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
