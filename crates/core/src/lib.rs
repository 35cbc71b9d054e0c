//! Queue and roster state for the standby bot.
//!
//! The [`queue::QueueEngine`] owns the single sign-up session of the configured
//! channel and drives every outbound post through a [`gateway::NotificationGateway`].
//! [`roster::StandbyRoster`] is the role-toggle variant built on a
//! [`gateway::RoleDirectory`].

pub mod config;
pub mod domain;
pub mod errors;
pub mod gateway;
pub mod phrases;
pub mod queue;
pub mod roster;

pub use config::{AppConfig, ConfigError, LoadOptions, QueueMode};
pub use domain::member::{GuildId, GuildMember, RoleId, UserRef};
pub use domain::message::{ChannelId, MessageRef};
pub use errors::QueueError;
pub use gateway::{
    GatewayError, InMemoryGateway, NotificationGateway, OutboundMessage, Rendering, RoleDirectory,
    RoleResolver,
};
pub use queue::{QueueCommand, QueueEngine, QueueOutcome, QueuePolicy, QueueSession};
pub use roster::{PurgeReport, RosterSettings, StandbyRoster, ToggleOutcome};
