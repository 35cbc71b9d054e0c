//! Discord HTTP API client.
//!
//! Implements the core gateway traits over API v10 plus interaction callbacks and guild
//! command registration. Non-2xx responses surface as [`GatewayError::Status`] so callers
//! can tell a vanished message (404) from a transient failure.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use standby_core::domain::member::{GuildId, GuildMember, RoleId, UserRef};
use standby_core::domain::message::{ChannelId, MessageRef};
use standby_core::gateway::{
    GatewayError, NotificationGateway, OutboundMessage, RoleDirectory, RoleResolver,
};
use tracing::{debug, info};

use crate::commands::CommandDefinition;
use crate::components::{message_payload, InteractionCallback, InteractionReply, ReplyPayload};
use crate::events::InteractionEnvelope;
use crate::socket::{InteractionResponder, TransportError};

const MEMBER_PAGE_LIMIT: usize = 1000;

#[derive(Clone)]
pub struct DiscordRestClient {
    client: Client,
    base_url: String,
    token: SecretString,
    application_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

/// The bot account behind the configured token.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct MemberUser {
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Debug, Deserialize)]
struct MemberRecord {
    user: MemberUser,
    #[serde(default)]
    roles: Vec<String>,
}

impl From<MemberRecord> for GuildMember {
    fn from(record: MemberRecord) -> Self {
        GuildMember {
            user: UserRef::new(record.user.id),
            is_bot: record.user.bot,
            roles: record.roles.into_iter().map(RoleId::new).collect(),
        }
    }
}

impl DiscordRestClient {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        application_id: impl Into<String>,
    ) -> Self {
        Self::with_client(Client::new(), base_url, token, application_id)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        token: SecretString,
        application_id: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url, token, application_id: application_id.into() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("Authorization", format!("Bot {}", self.token.expose_secret()))
    }

    /// Interaction callbacks and webhooks authenticate with the interaction token instead.
    fn unauthenticated(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response =
            request.send().await.map_err(|error| GatewayError::Request(error.to_string()))?;
        check_status(response).await
    }

    /// Resolves the bot user; fails with a 401 status when the token is rejected.
    pub async fn current_user(&self) -> Result<BotIdentity, GatewayError> {
        let response = self.send(self.request(Method::GET, "/users/@me")).await?;
        response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))
    }

    pub async fn register_guild_commands(
        &self,
        guild: &GuildId,
        commands: &[CommandDefinition],
    ) -> Result<(), GatewayError> {
        let path = format!("/applications/{}/guilds/{}/commands", self.application_id, guild);
        self.send(self.request(Method::PUT, &path).json(commands)).await?;
        info!(
            event_name = "discord.commands.registered",
            guild_id = %guild,
            count = commands.len(),
            "registered guild slash commands"
        );
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status { status: status.as_u16(), body })
}

fn decode_members(body: &str) -> Result<Vec<GuildMember>, GatewayError> {
    let records: Vec<MemberRecord> =
        serde_json::from_str(body).map_err(|error| GatewayError::Decode(error.to_string()))?;
    Ok(records.into_iter().map(GuildMember::from).collect())
}

#[async_trait]
impl NotificationGateway for DiscordRestClient {
    async fn send_message(
        &self,
        channel: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageRef, GatewayError> {
        let path = format!("/channels/{channel}/messages");
        let response =
            self.send(self.request(Method::POST, &path).json(&message_payload(message))).await?;
        let created: CreatedMessage =
            response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))?;

        debug!(channel_id = %channel, message_id = %created.id, "posted channel message");
        Ok(MessageRef::new(created.id))
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message_ref: &MessageRef,
        message: &OutboundMessage,
    ) -> Result<(), GatewayError> {
        let path = format!("/channels/{channel}/messages/{message_ref}");
        self.send(self.request(Method::PATCH, &path).json(&message_payload(message))).await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message_ref: &MessageRef,
    ) -> Result<(), GatewayError> {
        let path = format!("/channels/{channel}/messages/{message_ref}");
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}

#[async_trait]
impl RoleResolver for DiscordRestClient {
    async fn member_roles(
        &self,
        guild: &GuildId,
        user: &UserRef,
    ) -> Result<BTreeSet<RoleId>, GatewayError> {
        let path = format!("/guilds/{guild}/members/{user}");
        let response = self.send(self.request(Method::GET, &path)).await?;
        let record: MemberRecord =
            response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))?;
        Ok(record.roles.into_iter().map(RoleId::new).collect())
    }
}

#[async_trait]
impl RoleDirectory for DiscordRestClient {
    async fn add_member_role(
        &self,
        guild: &GuildId,
        user: &UserRef,
        role: &RoleId,
    ) -> Result<(), GatewayError> {
        let path = format!("/guilds/{guild}/members/{user}/roles/{}", role.as_str());
        self.send(self.request(Method::PUT, &path)).await?;
        Ok(())
    }

    async fn remove_member_role(
        &self,
        guild: &GuildId,
        user: &UserRef,
        role: &RoleId,
    ) -> Result<(), GatewayError> {
        let path = format!("/guilds/{guild}/members/{user}/roles/{}", role.as_str());
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn list_members(&self, guild: &GuildId) -> Result<Vec<GuildMember>, GatewayError> {
        let mut members = Vec::new();
        let mut after = String::from("0");

        loop {
            let path =
                format!("/guilds/{guild}/members?limit={MEMBER_PAGE_LIMIT}&after={after}");
            let response = self.send(self.request(Method::GET, &path)).await?;
            let body =
                response.text().await.map_err(|error| GatewayError::Decode(error.to_string()))?;
            let page = decode_members(&body)?;
            let page_len = page.len();

            match page.last() {
                Some(last) => after = last.user.as_str().to_owned(),
                None => break,
            }
            members.extend(page);

            if page_len < MEMBER_PAGE_LIMIT {
                break;
            }
        }

        Ok(members)
    }
}

#[async_trait]
impl InteractionResponder for DiscordRestClient {
    async fn acknowledge(
        &self,
        envelope: &InteractionEnvelope,
        callback: &InteractionCallback,
    ) -> Result<(), TransportError> {
        let path =
            format!("/interactions/{}/{}/callback", envelope.interaction_id, envelope.token);
        self.send(self.unauthenticated(Method::POST, &path).json(callback))
            .await
            .map(|_| ())
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn follow_up(
        &self,
        envelope: &InteractionEnvelope,
        reply: &InteractionReply,
    ) -> Result<(), TransportError> {
        let path = format!("/webhooks/{}/{}", self.application_id, envelope.token);
        self.send(self.unauthenticated(Method::POST, &path).json(&ReplyPayload::from(reply)))
            .await
            .map(|_| ())
            .map_err(|error| TransportError::FollowUp(error.to_string()))
    }
}
