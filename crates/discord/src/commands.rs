use serde::Serialize;
use standby_core::config::QueueMode;
use thiserror::Error;

pub const STANDBY_COMMAND: &str = "standby";
pub const PURGE_COMMAND: &str = "standby-purge";

const CHAT_INPUT: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub name: String,
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StandbyCommand {
    /// Open a queue with the caller as first participant.
    Start { user_id: String },
    /// Flip the caller's standby role.
    Toggle { user_id: String },
    /// Strip the standby role from everyone.
    Purge { user_id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("slash command `{0}` was invoked outside the configured guild")]
    WrongGuild(String),
}

/// Guild command registration body (`PUT /applications/{app}/guilds/{guild}/commands`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

impl CommandDefinition {
    fn chat_input(name: &str, description: &str) -> Self {
        Self { name: name.to_owned(), description: description.to_owned(), kind: CHAT_INPUT }
    }
}

pub fn command_definitions(mode: QueueMode) -> Vec<CommandDefinition> {
    match mode {
        QueueMode::Queue => {
            vec![CommandDefinition::chat_input(STANDBY_COMMAND, "Start a standby queue")]
        }
        QueueMode::Roster => vec![
            CommandDefinition::chat_input(STANDBY_COMMAND, "Toggle the standby role"),
            CommandDefinition::chat_input(
                PURGE_COMMAND,
                "Admin command to remove all members from standby",
            ),
        ],
    }
}

pub fn normalize_standby_command(
    payload: &SlashCommandPayload,
    mode: QueueMode,
    guild_id: &str,
) -> Result<StandbyCommand, CommandParseError> {
    if payload.guild_id.as_deref().is_some_and(|invoked| invoked != guild_id) {
        return Err(CommandParseError::WrongGuild(payload.name.clone()));
    }

    let name = payload.name.trim().trim_start_matches('/').to_ascii_lowercase();
    let user_id = payload.user_id.clone();
    match (mode, name.as_str()) {
        (QueueMode::Queue, STANDBY_COMMAND) => Ok(StandbyCommand::Start { user_id }),
        (QueueMode::Roster, STANDBY_COMMAND) => Ok(StandbyCommand::Toggle { user_id }),
        (QueueMode::Roster, PURGE_COMMAND) => Ok(StandbyCommand::Purge { user_id }),
        _ => Err(CommandParseError::UnsupportedCommand(payload.name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use standby_core::config::QueueMode;

    use super::{
        command_definitions, normalize_standby_command, CommandParseError, SlashCommandPayload,
        StandbyCommand, PURGE_COMMAND,
    };

    fn payload(name: &str) -> SlashCommandPayload {
        SlashCommandPayload {
            name: name.to_owned(),
            user_id: "U1".to_owned(),
            channel_id: "C1".to_owned(),
            guild_id: Some("G1".to_owned()),
        }
    }

    #[test]
    fn standby_command_depends_on_mode() {
        assert_eq!(
            normalize_standby_command(&payload("standby"), QueueMode::Queue, "G1"),
            Ok(StandbyCommand::Start { user_id: "U1".to_owned() })
        );
        assert_eq!(
            normalize_standby_command(&payload("/Standby"), QueueMode::Roster, "G1"),
            Ok(StandbyCommand::Toggle { user_id: "U1".to_owned() })
        );
    }

    #[test]
    fn purge_is_only_known_in_roster_mode() {
        assert_eq!(
            normalize_standby_command(&payload(PURGE_COMMAND), QueueMode::Roster, "G1"),
            Ok(StandbyCommand::Purge { user_id: "U1".to_owned() })
        );
        assert_eq!(
            normalize_standby_command(&payload(PURGE_COMMAND), QueueMode::Queue, "G1"),
            Err(CommandParseError::UnsupportedCommand(PURGE_COMMAND.to_owned()))
        );
    }

    #[test]
    fn commands_from_other_guilds_are_rejected() {
        assert_eq!(
            normalize_standby_command(&payload("standby"), QueueMode::Queue, "G2"),
            Err(CommandParseError::WrongGuild("standby".to_owned()))
        );
    }

    #[test]
    fn registration_lists_mode_specific_commands() {
        let queue: Vec<_> =
            command_definitions(QueueMode::Queue).into_iter().map(|c| c.name).collect();
        let roster: Vec<_> =
            command_definitions(QueueMode::Roster).into_iter().map(|c| c.name).collect();

        assert_eq!(queue, vec!["standby"]);
        assert_eq!(roster, vec!["standby", "standby-purge"]);
    }
}
