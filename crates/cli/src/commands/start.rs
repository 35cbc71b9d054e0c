use standby_core::config::{AppConfig, LoadOptions};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => CommandResult::success(
            "start",
            format!(
                "preflight passed: mode={:?} channel={} capacity={}",
                config.queue.mode, config.discord.channel_id, config.queue.capacity
            ),
        ),
        Err(error) => CommandResult::failure("start", "config_validation", error.to_string(), 2),
    }
}
