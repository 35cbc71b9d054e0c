use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use standby_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_key: &'static str,
    value: &'a str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let bot_token = redact_token(config.discord.bot_token.expose_secret());
    let standby_role = config.discord.standby_role_id.as_deref().unwrap_or("<unset>");
    let mode = format!("{:?}", config.queue.mode).to_ascii_lowercase();
    let capacity = config.queue.capacity.to_string();
    let waitlist_enabled = config.queue.waitlist_enabled.to_string();
    let overflow_policy = format!("{:?}", config.queue.overflow_policy).to_ascii_lowercase();
    let admin_only_close = config.queue.admin_only_close.to_string();
    let health_check_port = config.server.health_check_port.to_string();
    let log_format = format!("{:?}", config.logging.format).to_ascii_lowercase();

    let fields = [
        Field {
            key_path: "discord.bot_token",
            env_key: "STANDBY_DISCORD_BOT_TOKEN",
            value: &bot_token,
        },
        Field {
            key_path: "discord.application_id",
            env_key: "STANDBY_DISCORD_APPLICATION_ID",
            value: &config.discord.application_id,
        },
        Field {
            key_path: "discord.public_key",
            env_key: "STANDBY_DISCORD_PUBLIC_KEY",
            value: &config.discord.public_key,
        },
        Field {
            key_path: "discord.guild_id",
            env_key: "STANDBY_DISCORD_GUILD_ID",
            value: &config.discord.guild_id,
        },
        Field {
            key_path: "discord.channel_id",
            env_key: "STANDBY_DISCORD_CHANNEL_ID",
            value: &config.discord.channel_id,
        },
        Field {
            key_path: "discord.admin_role_id",
            env_key: "STANDBY_DISCORD_ADMIN_ROLE_ID",
            value: &config.discord.admin_role_id,
        },
        Field {
            key_path: "discord.standby_role_id",
            env_key: "STANDBY_DISCORD_STANDBY_ROLE_ID",
            value: standby_role,
        },
        Field {
            key_path: "discord.api_base_url",
            env_key: "STANDBY_DISCORD_API_BASE_URL",
            value: &config.discord.api_base_url,
        },
        Field { key_path: "queue.mode", env_key: "STANDBY_QUEUE_MODE", value: &mode },
        Field { key_path: "queue.capacity", env_key: "STANDBY_QUEUE_CAPACITY", value: &capacity },
        Field {
            key_path: "queue.waitlist_enabled",
            env_key: "STANDBY_QUEUE_WAITLIST_ENABLED",
            value: &waitlist_enabled,
        },
        Field {
            key_path: "queue.overflow_policy",
            env_key: "STANDBY_QUEUE_OVERFLOW_POLICY",
            value: &overflow_policy,
        },
        Field {
            key_path: "queue.admin_only_close",
            env_key: "STANDBY_QUEUE_ADMIN_ONLY_CLOSE",
            value: &admin_only_close,
        },
        Field {
            key_path: "server.bind_address",
            env_key: "STANDBY_SERVER_BIND_ADDRESS",
            value: &config.server.bind_address,
        },
        Field {
            key_path: "server.health_check_port",
            env_key: "STANDBY_SERVER_HEALTH_CHECK_PORT",
            value: &health_check_port,
        },
        Field {
            key_path: "logging.level",
            env_key: "STANDBY_LOGGING_LEVEL",
            value: &config.logging.level,
        },
        Field { key_path: "logging.format", env_key: "STANDBY_LOGGING_FORMAT", value: &log_format },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        lines.push(render_line(
            field.key_path,
            field.value,
            field_source(
                field.key_path,
                Some(field.env_key),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("standby.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/standby.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Discord tokens are `<base64 user id>.<timestamp>.<hmac>`; only the id segment is shown.
pub(crate) fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('.') {
        Some((id_segment, _)) if !id_segment.is_empty() => format!("{id_segment}.***"),
        _ => "<redacted>".to_string(),
    }
}
