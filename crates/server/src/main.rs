mod bootstrap;
mod health;
mod interactions;

use std::time::Duration;

use anyhow::Result;
use standby_core::config::{AppConfig, LoadOptions};
use standby_discord::inbound::InteractionInbox;
use tokio::task::JoinHandle;

fn init_logging(config: &AppConfig) {
    use standby_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    bootstrap::register_commands(&app).await;

    let routes = health::router(app.runtime.clone()).merge(interactions::router(
        interactions::InteractionsState {
            verifier: app.verifier.clone(),
            inbox: app.inbox.clone(),
            response_window: interactions::RESPONSE_WINDOW,
        },
    ));
    health::spawn(&app.config.server.bind_address, app.config.server.health_check_port, routes)
        .await?;

    let runner = app.runner;
    let runner_task = tokio::spawn(async move { runner.start().await });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        mode = ?app.runtime.mode(),
        channel_id = %app.config.discord.channel_id,
        "standby-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "standby-server stopping"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    drain_runner(&app.inbox, runner_task, grace).await;

    Ok(())
}

/// Closes the inbox so the runner finishes in-flight interactions and returns, aborting it
/// if that takes longer than `grace`.
async fn drain_runner(
    inbox: &InteractionInbox,
    mut runner_task: JoinHandle<Result<()>>,
    grace: Duration,
) -> bool {
    inbox.close().await;
    match tokio::time::timeout(grace, &mut runner_task).await {
        Ok(Ok(Ok(()))) => true,
        Ok(Ok(Err(error))) => {
            tracing::warn!(error = %error, "interaction runner ended with error");
            true
        }
        Ok(Err(error)) => {
            tracing::warn!(error = %error, "interaction runner task failed");
            true
        }
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "interaction runner did not stop within the shutdown grace period"
            );
            runner_task.abort();
            false
        }
    }
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use standby_discord::events::EventDispatcher;
    use standby_discord::socket::NoopInteractionResponder;

    use super::drain_runner;
    use crate::bootstrap::interaction_runner;

    #[tokio::test]
    async fn shutdown_lets_the_runner_return_on_its_own() {
        let (inbox, runner) =
            interaction_runner(EventDispatcher::default(), Arc::new(NoopInteractionResponder));
        let runner_task = tokio::spawn(async move { runner.start().await });

        let stopped = drain_runner(&inbox, runner_task, Duration::from_secs(5)).await;

        assert!(stopped, "closing the inbox should end the runner within the grace period");
    }

    #[tokio::test]
    async fn shutdown_aborts_a_runner_that_outlives_the_grace_period() {
        let (inbox, _runner) =
            interaction_runner(EventDispatcher::default(), Arc::new(NoopInteractionResponder));
        let stuck = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), anyhow::Error>(())
        });

        let stopped = drain_runner(&inbox, stuck, Duration::from_millis(10)).await;

        assert!(!stopped);
    }
}
