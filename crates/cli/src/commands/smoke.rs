use std::sync::Arc;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use serde::Serialize;
use standby_core::config::{AppConfig, LoadOptions};
use standby_core::domain::member::UserRef;
use standby_core::domain::message::ChannelId;
use standby_core::gateway::{InMemoryGateway, QueueAction, RenderTone};
use standby_core::queue::{QueueEngine, QueuePolicy};
use tokio::runtime::Runtime;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("queue_fill"));
            checks.push(skipped("queue_close"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "queue_fill",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("queue_close"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let policy = config.queue.policy();
    let gateway = Arc::new(InMemoryGateway::new());
    let engine = QueueEngine::new(gateway.clone(), ChannelId::new("smoke"), policy);

    let fill = timed_check(|| fill_queue(&runtime, &engine, &gateway, &policy));
    let filled = fill.is_ok();
    checks.push(to_check("queue_fill", fill, "queue filled to capacity and alert posted"));

    if !filled {
        checks.push(skipped("queue_close"));
        return finalize_report(checks, started.elapsed().as_millis() as u64);
    }

    let close = timed_check(|| close_queue(&runtime, &engine, &gateway));
    checks.push(to_check("queue_close", close, "queue closed and notifications cleared"));

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn fill_queue(
    runtime: &Runtime,
    engine: &QueueEngine,
    gateway: &InMemoryGateway,
    policy: &QueuePolicy,
) -> Result<()> {
    runtime.block_on(async {
        engine.start(UserRef::new("smoke-0")).await.context("start failed")?;
        for index in 1..policy.capacity {
            engine
                .join(UserRef::new(format!("smoke-{index}")))
                .await
                .with_context(|| format!("join {index} failed"))?;
        }

        let session = engine.snapshot().await;
        ensure!(
            session.participants().len() == policy.capacity,
            "expected {} participants, found {}",
            policy.capacity,
            session.participants().len()
        );
        ensure!(
            session.capacity_notification().is_some(),
            "capacity notification was not posted"
        );
        ensure!(
            gateway.live_texts().iter().any(|text| text.contains("There are enough users")),
            "capacity alert text missing from channel"
        );

        let rendering = engine.current_rendering().await;
        let expected = format!("Queued users ({})", policy.capacity);
        ensure!(
            rendering.tone == RenderTone::Active && rendering.body.contains(&expected),
            "queue post does not list {} users",
            policy.capacity
        );
        Ok(())
    })
}

fn close_queue(runtime: &Runtime, engine: &QueueEngine, gateway: &InMemoryGateway) -> Result<()> {
    runtime.block_on(async {
        engine.close().await.context("close failed")?;

        let session = engine.snapshot().await;
        ensure!(!session.is_open(), "queue still open after close");
        ensure!(gateway.live_count() == 1, "expected only the closed post to remain");

        let rendering = engine.current_rendering().await;
        ensure!(rendering.tone == RenderTone::Closed, "queue post is not rendered closed");
        ensure!(
            rendering
                .buttons
                .iter()
                .any(|button| button.action == QueueAction::Open && !button.disabled),
            "closed queue post offers no Open button"
        );
        Ok(())
    })
}

fn to_check(
    name: &'static str,
    result: Result<(u64, ()), (u64, anyhow::Error)>,
    success: &str,
) -> SmokeCheck {
    match result {
        Ok((elapsed_ms, ())) => {
            SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message: success.to_string() }
        }
        Err((elapsed_ms, error)) => SmokeCheck {
            name,
            status: SmokeStatus::Fail,
            elapsed_ms,
            message: format!("{error:#}"),
        },
    }
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
