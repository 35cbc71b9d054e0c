use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::member::{GuildId, RoleId};
use crate::domain::message::ChannelId;
use crate::queue::session::{OverflowPolicy, QueuePolicy};

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub queue: QueueConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub application_id: String,
    /// Hex ed25519 key Discord signs interaction requests with.
    pub public_key: String,
    pub guild_id: String,
    pub channel_id: String,
    pub admin_role_id: String,
    pub standby_role_id: Option<String>,
    pub api_base_url: String,
}

impl DiscordConfig {
    pub fn guild(&self) -> GuildId {
        GuildId::new(self.guild_id.clone())
    }

    pub fn channel(&self) -> ChannelId {
        ChannelId::new(self.channel_id.clone())
    }

    pub fn admin_role(&self) -> RoleId {
        RoleId::new(self.admin_role_id.clone())
    }

    pub fn standby_role(&self) -> Option<RoleId> {
        self.standby_role_id.clone().map(RoleId::new)
    }
}

#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub mode: QueueMode,
    pub capacity: usize,
    pub waitlist_enabled: bool,
    pub overflow_policy: OverflowPolicy,
    pub admin_only_close: bool,
}

impl QueueConfig {
    pub fn policy(&self) -> QueuePolicy {
        QueuePolicy {
            capacity: self.capacity,
            waitlist_enabled: self.waitlist_enabled,
            overflow: self.overflow_policy,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Which bot the process runs: the button queue or the role-toggle roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    Queue,
    Roster,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub discord_bot_token: Option<String>,
    pub discord_channel_id: Option<String>,
    pub queue_mode: Option<QueueMode>,
    pub queue_capacity: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                bot_token: String::new().into(),
                application_id: String::new(),
                public_key: String::new(),
                guild_id: String::new(),
                channel_id: String::new(),
                admin_role_id: String::new(),
                standby_role_id: None,
                api_base_url: DEFAULT_API_BASE_URL.to_string(),
            },
            queue: QueueConfig {
                mode: QueueMode::Queue,
                capacity: 5,
                waitlist_enabled: true,
                overflow_policy: OverflowPolicy::Unbounded,
                admin_only_close: true,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for QueueMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(Self::Queue),
            "roster" => Ok(Self::Roster),
            other => Err(ConfigError::Validation(format!(
                "unsupported queue mode `{other}` (expected queue|roster)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

fn parse_overflow_policy(value: &str) -> Result<OverflowPolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "unbounded" => Ok(OverflowPolicy::Unbounded),
        "reject" => Ok(OverflowPolicy::Reject),
        other => Err(ConfigError::Validation(format!(
            "unsupported overflow policy `{other}` (expected unbounded|reject)"
        ))),
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("standby.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = secret_value(bot_token_value);
            }
            if let Some(application_id) = discord.application_id {
                self.discord.application_id = application_id;
            }
            if let Some(public_key) = discord.public_key {
                self.discord.public_key = public_key;
            }
            if let Some(guild_id) = discord.guild_id {
                self.discord.guild_id = guild_id;
            }
            if let Some(channel_id) = discord.channel_id {
                self.discord.channel_id = channel_id;
            }
            if let Some(admin_role_id) = discord.admin_role_id {
                self.discord.admin_role_id = admin_role_id;
            }
            if let Some(standby_role_id) = discord.standby_role_id {
                self.discord.standby_role_id = Some(standby_role_id);
            }
            if let Some(api_base_url) = discord.api_base_url {
                self.discord.api_base_url = api_base_url;
            }
        }

        if let Some(queue) = patch.queue {
            if let Some(mode) = queue.mode {
                self.queue.mode = mode;
            }
            if let Some(capacity) = queue.capacity {
                self.queue.capacity = capacity;
            }
            if let Some(waitlist_enabled) = queue.waitlist_enabled {
                self.queue.waitlist_enabled = waitlist_enabled;
            }
            if let Some(overflow_policy) = queue.overflow_policy {
                self.queue.overflow_policy = overflow_policy;
            }
            if let Some(admin_only_close) = queue.admin_only_close {
                self.queue.admin_only_close = admin_only_close;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STANDBY_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("STANDBY_DISCORD_APPLICATION_ID") {
            self.discord.application_id = value;
        }
        if let Some(value) = read_env("STANDBY_DISCORD_PUBLIC_KEY") {
            self.discord.public_key = value;
        }
        if let Some(value) = read_env("STANDBY_DISCORD_GUILD_ID") {
            self.discord.guild_id = value;
        }
        if let Some(value) = read_env("STANDBY_DISCORD_CHANNEL_ID") {
            self.discord.channel_id = value;
        }
        if let Some(value) = read_env("STANDBY_DISCORD_ADMIN_ROLE_ID") {
            self.discord.admin_role_id = value;
        }
        if let Some(value) = read_env("STANDBY_DISCORD_STANDBY_ROLE_ID") {
            self.discord.standby_role_id = Some(value);
        }
        if let Some(value) = read_env("STANDBY_DISCORD_API_BASE_URL") {
            self.discord.api_base_url = value;
        }

        if let Some(value) = read_env("STANDBY_QUEUE_MODE") {
            self.queue.mode = value.parse()?;
        }
        if let Some(value) = read_env("STANDBY_QUEUE_CAPACITY") {
            self.queue.capacity = parse_usize("STANDBY_QUEUE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("STANDBY_QUEUE_WAITLIST_ENABLED") {
            self.queue.waitlist_enabled = parse_bool("STANDBY_QUEUE_WAITLIST_ENABLED", &value)?;
        }
        if let Some(value) = read_env("STANDBY_QUEUE_OVERFLOW_POLICY") {
            self.queue.overflow_policy = parse_overflow_policy(&value)?;
        }
        if let Some(value) = read_env("STANDBY_QUEUE_ADMIN_ONLY_CLOSE") {
            self.queue.admin_only_close = parse_bool("STANDBY_QUEUE_ADMIN_ONLY_CLOSE", &value)?;
        }

        if let Some(value) = read_env("STANDBY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STANDBY_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("STANDBY_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("STANDBY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("STANDBY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("STANDBY_LOGGING_LEVEL").or_else(|| read_env("STANDBY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STANDBY_LOGGING_FORMAT").or_else(|| read_env("STANDBY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.discord_bot_token {
            self.discord.bot_token = secret_value(bot_token);
        }
        if let Some(channel_id) = overrides.discord_channel_id {
            self.discord.channel_id = channel_id;
        }
        if let Some(mode) = overrides.queue_mode {
            self.queue.mode = mode;
        }
        if let Some(capacity) = overrides.queue_capacity {
            self.queue.capacity = capacity;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_queue(&self.queue, &self.discord)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("standby.toml"), PathBuf::from("config/standby.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_snowflake(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}

fn require_snowflake(key: &str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{key} is required. Enable Developer Mode in Discord and use \"Copy ID\" to get it"
        )));
    }
    if !is_snowflake(value) {
        return Err(ConfigError::Validation(format!(
            "{key} must be a numeric Discord ID, got `{value}`"
        )));
    }
    Ok(())
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let bot_token = discord.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Get it from https://discord.com/developers/applications > Your App > Bot > Reset Token".to_string()
        ));
    }
    if bot_token.starts_with("Bot ") {
        return Err(ConfigError::Validation(
            "discord.bot_token must be the raw token without the `Bot ` prefix".to_string(),
        ));
    }

    require_snowflake("discord.application_id", &discord.application_id)?;
    let public_key = discord.public_key.trim();
    if public_key.len() != 64 || !public_key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::Validation(
            "discord.public_key must be the 64-character hex key from https://discord.com/developers/applications > Your App > General Information".to_string()
        ));
    }
    require_snowflake("discord.guild_id", &discord.guild_id)?;
    require_snowflake("discord.channel_id", &discord.channel_id)?;
    require_snowflake("discord.admin_role_id", &discord.admin_role_id)?;
    if let Some(standby_role_id) = &discord.standby_role_id {
        require_snowflake("discord.standby_role_id", standby_role_id)?;
    }

    let base_url = discord.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "discord.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_queue(queue: &QueueConfig, discord: &DiscordConfig) -> Result<(), ConfigError> {
    if queue.capacity < 2 {
        return Err(ConfigError::Validation(
            "queue.capacity must be at least 2 so a one-more slot exists".to_string(),
        ));
    }

    if queue.mode == QueueMode::Roster && discord.standby_role_id.is_none() {
        return Err(ConfigError::Validation(
            "discord.standby_role_id is required when queue.mode is `roster`".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    queue: Option<QueuePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    application_id: Option<String>,
    public_key: Option<String>,
    guild_id: Option<String>,
    channel_id: Option<String>,
    admin_role_id: Option<String>,
    standby_role_id: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QueuePatch {
    mode: Option<QueueMode>,
    capacity: Option<usize>,
    waitlist_enabled: Option<bool>,
    overflow_policy: Option<OverflowPolicy>,
    admin_only_close: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
