//! Discord adapter for standby.
//!
//! - **Components** (`components`) - message payloads (embed + button row) and interaction replies
//! - **Commands** (`commands`) - `/standby` and `/standby-purge` parsing and registration bodies
//! - **Events** (`events`) - interaction envelopes, `EventDispatcher` and the mode handlers
//! - **Socket** (`socket`) - `GatewayRunner` interaction loop with reconnection
//! - **Inbound** (`inbound`) - request signature checks and the channel-backed `InteractionInbox`
//! - **REST** (`rest`) - `DiscordRestClient`, the HTTP implementation of the core gateways
//!
//! # Architecture
//!
//! ```text
//! POST /interactions → InteractionInbox → GatewayRunner → EventDispatcher
//!                                                              ↓
//!                                               QueueEngine / StandbyRoster
//!                                                              ↓
//!                       DiscordRestClient ← NotificationGateway / RoleDirectory
//! ```

pub mod commands;
pub mod components;
pub mod events;
pub mod inbound;
pub mod rest;
pub mod socket;
