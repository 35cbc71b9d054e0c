pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "standby",
    about = "Standby bot operator CLI",
    long_about = "Inspect standby configuration, check Discord readiness, and run offline queue smoke checks.",
    after_help = "Examples:\n  standby doctor --json\n  standby config\n  standby smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Exercise the queue engine against an in-memory channel")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bot token format, and Discord API reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Skip checks that call the Discord API")]
        offline: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json, offline } => commands::doctor::run(json, offline),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
