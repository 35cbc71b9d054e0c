use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use serde::Serialize;
use standby_core::config::{AppConfig, LoadOptions};
use standby_discord::rest::DiscordRestClient;

use crate::commands::CommandResult;

const DOCTOR_FAILURE_EXIT_CODE: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool, offline: bool) -> CommandResult {
    let report = build_report(offline);
    let exit_code = if report.overall_status == CheckStatus::Pass {
        0
    } else {
        DOCTOR_FAILURE_EXIT_CODE
    };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(offline: bool) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_token_format(&config));
            if offline {
                checks.push(DoctorCheck {
                    name: "discord_api_reachability",
                    status: CheckStatus::Skipped,
                    details: "skipped in offline mode".to_string(),
                });
            } else {
                checks.push(check_discord_api(&config));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "discord_token_format",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "discord_api_reachability",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_token_format(config: &AppConfig) -> DoctorCheck {
    let token = config.discord.bot_token.expose_secret();
    let segments = token.split('.').filter(|segment| !segment.is_empty()).count();

    if segments == 3 {
        DoctorCheck {
            name: "discord_token_format",
            status: CheckStatus::Pass,
            details: "bot token has the expected three segments".to_string(),
        }
    } else {
        DoctorCheck {
            name: "discord_token_format",
            status: CheckStatus::Fail,
            details: format!(
                "expected a bot token with three dot-separated segments, got {segments}"
            ),
        }
    }
}

fn check_discord_api(config: &AppConfig) -> DoctorCheck {
    match probe_discord_api(config) {
        Ok(username) => DoctorCheck {
            name: "discord_api_reachability",
            status: CheckStatus::Pass,
            details: format!("authenticated as `{username}`"),
        },
        Err(error) => DoctorCheck {
            name: "discord_api_reachability",
            status: CheckStatus::Fail,
            details: format!("{error:#}"),
        },
    }
}

fn probe_discord_api(config: &AppConfig) -> Result<String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;

    let client = DiscordRestClient::new(
        config.discord.api_base_url.clone(),
        config.discord.bot_token.clone(),
        config.discord.application_id.clone(),
    );
    let identity = runtime
        .block_on(client.current_user())
        .with_context(|| format!("GET {}/users/@me failed", client.base_url()))?;

    Ok(identity.username)
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
