use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use standby_core::config::QueueMode;
use tracing::{error, info};

use crate::bootstrap::ModeRuntime;

#[derive(Clone)]
pub struct HealthState {
    runtime: ModeRuntime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub mode: QueueMode,
    pub open: bool,
    pub participants: usize,
    pub waitlist: usize,
    pub capacity: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub queue: QueueStatus,
    pub checked_at: String,
}

pub fn router(runtime: ModeRuntime) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { runtime })
}

/// Serves `app` (the health route plus the interactions endpoint) in the background.
pub async fn spawn(bind_address: &str, port: u16, app: Router) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "http endpoints started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "http server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let queue = queue_status(&state.runtime).await;

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "standby-server runtime initialized".to_string(),
        },
        queue,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

async fn queue_status(runtime: &ModeRuntime) -> QueueStatus {
    match runtime {
        ModeRuntime::Queue(engine) => {
            let session = engine.snapshot().await;
            QueueStatus {
                mode: QueueMode::Queue,
                open: session.is_open(),
                participants: session.participants().len(),
                waitlist: session.waitlist().len(),
                capacity: engine.policy().capacity,
            }
        }
        // Counting role holders needs a member listing; the alert state is local.
        ModeRuntime::Roster(roster) => QueueStatus {
            mode: QueueMode::Roster,
            open: roster.active_alert().await.is_some(),
            participants: 0,
            waitlist: 0,
            capacity: roster.settings().threshold,
        },
    }
}
