use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use standby_core::config::QueueMode;
use standby_core::domain::member::{GuildId, RoleId, UserRef};
use standby_core::domain::message::MessageRef;
use standby_core::errors::QueueError;
use standby_core::gateway::{QueueAction, RoleResolver};
use standby_core::queue::{QueueCommand, QueueEngine, QueueOutcome};
use standby_core::roster::{PurgeReport, StandbyRoster};
use thiserror::Error;
use tracing::{debug, warn};

use crate::commands::{
    normalize_standby_command, CommandParseError, SlashCommandPayload, StandbyCommand,
};
use crate::components::{action_for_custom_id, InteractionReply};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionEnvelope {
    pub interaction_id: String,
    /// Continuation token used for callbacks and follow-ups.
    pub token: String,
    pub event: DiscordEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscordEvent {
    /// Endpoint liveness check sent by Discord; answered without dispatch.
    Ping,
    SlashCommand(SlashCommandPayload),
    ButtonClick(ButtonClickEvent),
    Unsupported { event_type: String },
}

impl DiscordEvent {
    pub fn event_type(&self) -> DiscordEventType {
        match self {
            Self::Ping => DiscordEventType::Ping,
            Self::SlashCommand(_) => DiscordEventType::SlashCommand,
            Self::ButtonClick(_) => DiscordEventType::ButtonClick,
            Self::Unsupported { .. } => DiscordEventType::Unsupported,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::SlashCommand(payload) => Some(&payload.user_id),
            Self::ButtonClick(event) => Some(&event.user_id),
            Self::Ping | Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiscordEventType {
    Ping,
    SlashCommand,
    ButtonClick,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonClickEvent {
    pub custom_id: String,
    pub user_id: String,
    pub channel_id: String,
    /// The message carrying the clicked button.
    pub message_id: String,
}

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;
const MESSAGE_COMPONENT: u8 = 3;

#[derive(Debug, Deserialize)]
struct RawInteraction {
    id: String,
    token: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Option<RawInteractionData>,
    guild_id: Option<String>,
    channel_id: Option<String>,
    member: Option<RawMember>,
    user: Option<RawUser>,
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawInteractionData {
    name: Option<String>,
    custom_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
}

/// Decodes a Discord interaction object into an envelope.
///
/// Interaction kinds other than pings, slash commands and button clicks, and payloads missing
/// the fields a handler needs, decode as [`DiscordEvent::Unsupported`].
pub fn decode_interaction(body: &str) -> Result<InteractionEnvelope, serde_json::Error> {
    let raw: RawInteraction = serde_json::from_str(body)?;
    let user_id = raw.member.map(|member| member.user).or(raw.user).map(|user| user.id);
    let data = raw.data;

    let event = match (raw.kind, user_id, raw.channel_id) {
        (PING, _, _) => DiscordEvent::Ping,
        (APPLICATION_COMMAND, Some(user_id), Some(channel_id)) => {
            match data.and_then(|data| data.name) {
                Some(name) => DiscordEvent::SlashCommand(SlashCommandPayload {
                    name,
                    user_id,
                    channel_id,
                    guild_id: raw.guild_id,
                }),
                None => DiscordEvent::Unsupported { event_type: "application_command".to_owned() },
            }
        }
        (MESSAGE_COMPONENT, Some(user_id), Some(channel_id)) => {
            match (data.and_then(|data| data.custom_id), raw.message) {
                (Some(custom_id), Some(message)) => DiscordEvent::ButtonClick(ButtonClickEvent {
                    custom_id,
                    user_id,
                    channel_id,
                    message_id: message.id,
                }),
                _ => DiscordEvent::Unsupported { event_type: "message_component".to_owned() },
            }
        }
        (kind, _, _) => {
            DiscordEvent::Unsupported { event_type: format!("interaction_type_{kind}") }
        }
    };

    Ok(InteractionEnvelope { interaction_id: raw.id, token: raw.token, event })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(InteractionReply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error("unknown button custom id `{0}`")]
    UnknownButton(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> DiscordEventType;
    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<DiscordEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn queue_dispatcher(
    engine: Arc<QueueEngine>,
    guild_id: impl Into<String>,
    close_guard: Option<AdminCheck>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(QueueCommandHandler::new(engine.clone(), guild_id));
    dispatcher.register(QueueButtonHandler::new(engine, close_guard));
    dispatcher
}

pub fn roster_dispatcher(
    roster: Arc<StandbyRoster>,
    guild_id: impl Into<String>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(RosterCommandHandler::new(roster, guild_id));
    dispatcher
}

/// Role check for admin-only actions. Lookup failures deny.
#[derive(Clone)]
pub struct AdminCheck {
    resolver: Arc<dyn RoleResolver>,
    guild: GuildId,
    admin_role: RoleId,
}

impl AdminCheck {
    pub fn new(resolver: Arc<dyn RoleResolver>, guild: GuildId, admin_role: RoleId) -> Self {
        Self { resolver, guild, admin_role }
    }

    pub async fn is_admin(&self, user: &UserRef) -> bool {
        match self.resolver.member_roles(&self.guild, user).await {
            Ok(roles) => roles.contains(&self.admin_role),
            Err(error) => {
                warn!(
                    event_name = "auth.role_lookup_failed",
                    user_id = %user,
                    error = %error,
                    "could not resolve member roles; denying admin action"
                );
                false
            }
        }
    }
}

fn error_reply(error: &QueueError) -> HandlerResult {
    HandlerResult::Responded(InteractionReply::ephemeral(error.user_message()))
}

pub struct QueueCommandHandler {
    engine: Arc<QueueEngine>,
    guild_id: String,
}

impl QueueCommandHandler {
    pub fn new(engine: Arc<QueueEngine>, guild_id: impl Into<String>) -> Self {
        Self { engine, guild_id: guild_id.into() }
    }
}

#[async_trait]
impl EventHandler for QueueCommandHandler {
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let StandbyCommand::Start { user_id } =
            normalize_standby_command(payload, QueueMode::Queue, &self.guild_id)?
        else {
            return Ok(HandlerResult::Ignored);
        };

        match self.engine.start(UserRef::new(user_id)).await {
            Ok(_) => Ok(HandlerResult::Responded(InteractionReply::ephemeral(
                "Queue started. Use the buttons on the queue post to join or leave.",
            ))),
            Err(error) => {
                debug!(
                    event_name = "queue.start_rejected",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "standby command did not open a queue"
                );
                Ok(error_reply(&error))
            }
        }
    }
}

pub struct QueueButtonHandler {
    engine: Arc<QueueEngine>,
    close_guard: Option<AdminCheck>,
}

impl QueueButtonHandler {
    /// `close_guard` restricts the Close button to admins when set.
    pub fn new(engine: Arc<QueueEngine>, close_guard: Option<AdminCheck>) -> Self {
        Self { engine, close_guard }
    }
}

#[async_trait]
impl EventHandler for QueueButtonHandler {
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::ButtonClick
    }

    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::ButtonClick(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let action = action_for_custom_id(&event.custom_id)
            .ok_or_else(|| EventHandlerError::UnknownButton(event.custom_id.clone()))?;
        let user = UserRef::new(event.user_id.clone());
        let origin = MessageRef::new(event.message_id.clone());

        let command = match action {
            QueueAction::Join => QueueCommand::Join { user },
            QueueAction::Leave => QueueCommand::Leave { user },
            QueueAction::Close => {
                if let Some(guard) = &self.close_guard {
                    if !guard.is_admin(&user).await {
                        return Ok(error_reply(&QueueError::NotAuthorized));
                    }
                }
                QueueCommand::Close
            }
            QueueAction::Open => QueueCommand::Reopen { user, closed_post: origin.clone() },
        };

        let result = self.engine.apply(command, Some(&origin)).await;
        debug!(
            event_name = "queue.button_applied",
            correlation_id = %ctx.correlation_id,
            action = ?action,
            user_id = %event.user_id,
            result = ?result,
            "queue button handled"
        );

        Ok(match result {
            Ok(QueueOutcome::StalePost) => HandlerResult::Responded(InteractionReply::ephemeral(
                "This queue post is no longer active.",
            )),
            Ok(_) => HandlerResult::Processed,
            Err(error) => error_reply(&error),
        })
    }
}

pub struct RosterCommandHandler {
    roster: Arc<StandbyRoster>,
    guild_id: String,
}

impl RosterCommandHandler {
    pub fn new(roster: Arc<StandbyRoster>, guild_id: impl Into<String>) -> Self {
        Self { roster, guild_id: guild_id.into() }
    }
}

fn purge_summary(report: &PurgeReport) -> String {
    match report.failed {
        0 => format!("Standby members purged ({} removed).", report.removed),
        failed => format!(
            "Standby members purged ({} removed, {failed} could not be removed).",
            report.removed
        ),
    }
}

#[async_trait]
impl EventHandler for RosterCommandHandler {
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let reply = match normalize_standby_command(payload, QueueMode::Roster, &self.guild_id)? {
            StandbyCommand::Toggle { user_id } => {
                match self.roster.toggle(&UserRef::new(user_id)).await {
                    Ok(outcome) => {
                        InteractionReply::ephemeral(outcome.reply(self.roster.settings().threshold))
                    }
                    Err(error) => InteractionReply::ephemeral(error.user_message()),
                }
            }
            StandbyCommand::Purge { user_id } => {
                match self.roster.purge(&UserRef::new(user_id)).await {
                    Ok(report) => InteractionReply::public(purge_summary(&report)),
                    Err(error) => InteractionReply::ephemeral(error.user_message()),
                }
            }
            StandbyCommand::Start { .. } => return Ok(HandlerResult::Ignored),
        };

        Ok(HandlerResult::Responded(reply))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use standby_core::domain::member::{GuildId, GuildMember, RoleId, UserRef};
    use standby_core::domain::message::{ChannelId, MessageRef};
    use standby_core::gateway::{GatewayOperation, InMemoryGateway};
    use standby_core::queue::{QueueEngine, QueueOutcome, QueuePolicy};
    use standby_core::roster::{PurgeReport, RosterSettings, StandbyRoster};

    use super::{
        decode_interaction, purge_summary, queue_dispatcher, roster_dispatcher, AdminCheck,
        ButtonClickEvent, DiscordEvent, DispatchError, EventContext, EventDispatcher,
        EventHandlerError, HandlerResult, InteractionEnvelope,
    };
    use crate::commands::SlashCommandPayload;
    use crate::components::{CLOSE_QUEUE, JOIN_QUEUE, OPEN_QUEUE};

    const ADMIN_ROLE: &str = "900";

    fn member(id: &str, roles: &[&str]) -> GuildMember {
        GuildMember {
            user: UserRef::new(id),
            is_bot: false,
            roles: roles.iter().map(|role| RoleId::new(*role)).collect(),
        }
    }

    fn slash(name: &str, user: &str) -> InteractionEnvelope {
        InteractionEnvelope {
            interaction_id: format!("i-{name}-{user}"),
            token: "token".to_owned(),
            event: DiscordEvent::SlashCommand(SlashCommandPayload {
                name: name.to_owned(),
                user_id: user.to_owned(),
                channel_id: "C1".to_owned(),
                guild_id: Some("G1".to_owned()),
            }),
        }
    }

    fn click(custom_id: &str, user: &str, message_id: &MessageRef) -> InteractionEnvelope {
        InteractionEnvelope {
            interaction_id: format!("i-{custom_id}-{user}"),
            token: "token".to_owned(),
            event: DiscordEvent::ButtonClick(ButtonClickEvent {
                custom_id: custom_id.to_owned(),
                user_id: user.to_owned(),
                channel_id: "C1".to_owned(),
                message_id: message_id.as_str().to_owned(),
            }),
        }
    }

    fn queue_fixture() -> (Arc<InMemoryGateway>, Arc<QueueEngine>, EventDispatcher) {
        let gateway = Arc::new(InMemoryGateway::with_members(vec![member("admin", &[ADMIN_ROLE])]));
        let engine = Arc::new(QueueEngine::new(
            gateway.clone(),
            ChannelId::new("C1"),
            QueuePolicy::default(),
        ));
        let guard = AdminCheck::new(gateway.clone(), GuildId::new("G1"), RoleId::new(ADMIN_ROLE));
        let dispatcher = queue_dispatcher(engine.clone(), "G1", Some(guard));
        (gateway, engine, dispatcher)
    }

    async fn primary(engine: &QueueEngine) -> MessageRef {
        engine.snapshot().await.primary_message().cloned().expect("queue is open")
    }

    #[tokio::test]
    async fn standby_command_opens_queue_with_caller() {
        let (_gateway, engine, dispatcher) = queue_fixture();

        let result = dispatcher.dispatch(&slash("standby", "u1"), &EventContext::default()).await;

        assert!(matches!(result, Ok(HandlerResult::Responded(ref reply)) if reply.ephemeral));
        assert_eq!(engine.snapshot().await.participants(), &[UserRef::new("u1")]);
    }

    #[tokio::test]
    async fn second_standby_command_reports_existing_queue() {
        let (_gateway, _engine, dispatcher) = queue_fixture();
        let ctx = EventContext::default();
        dispatcher.dispatch(&slash("standby", "u1"), &ctx).await.expect("dispatch");

        let result = dispatcher.dispatch(&slash("standby", "u2"), &ctx).await.expect("dispatch");

        let HandlerResult::Responded(reply) = result else {
            panic!("expected a reply");
        };
        assert_eq!(reply.content, "Queue already exists");
        assert!(reply.ephemeral);
    }

    #[tokio::test]
    async fn join_button_adds_clicker_to_live_queue() {
        let (_gateway, engine, dispatcher) = queue_fixture();
        let ctx = EventContext::default();
        dispatcher.dispatch(&slash("standby", "u1"), &ctx).await.expect("dispatch");
        let post = primary(&engine).await;

        let result = dispatcher.dispatch(&click(JOIN_QUEUE, "u2", &post), &ctx).await;

        assert_eq!(result, Ok(HandlerResult::Processed));
        assert_eq!(
            engine.snapshot().await.participants(),
            &[UserRef::new("u1"), UserRef::new("u2")]
        );
    }

    #[tokio::test]
    async fn clicks_on_stale_posts_do_not_mutate_queue() {
        let (_gateway, engine, dispatcher) = queue_fixture();
        let ctx = EventContext::default();
        dispatcher.dispatch(&slash("standby", "u1"), &ctx).await.expect("dispatch");

        let result = dispatcher
            .dispatch(&click(JOIN_QUEUE, "u2", &MessageRef::new("stale")), &ctx)
            .await
            .expect("dispatch");

        assert!(matches!(result, HandlerResult::Responded(_)));
        assert_eq!(engine.snapshot().await.participants().len(), 1);
    }

    #[tokio::test]
    async fn close_button_requires_admin() {
        let (_gateway, engine, dispatcher) = queue_fixture();
        let ctx = EventContext::default();
        dispatcher.dispatch(&slash("standby", "u1"), &ctx).await.expect("dispatch");
        let post = primary(&engine).await;

        let denied = dispatcher.dispatch(&click(CLOSE_QUEUE, "u1", &post), &ctx).await;
        let HandlerResult::Responded(reply) = denied.expect("dispatch") else {
            panic!("expected rejection");
        };
        assert_eq!(reply.content, "Only admins can use this command.");
        assert!(engine.snapshot().await.is_open());

        let allowed = dispatcher.dispatch(&click(CLOSE_QUEUE, "admin", &post), &ctx).await;
        assert_eq!(allowed, Ok(HandlerResult::Processed));
        assert!(!engine.snapshot().await.is_open());
    }

    #[tokio::test]
    async fn close_is_denied_when_role_lookup_fails() {
        let (gateway, engine, dispatcher) = queue_fixture();
        let ctx = EventContext::default();
        dispatcher.dispatch(&slash("standby", "u1"), &ctx).await.expect("dispatch");
        let post = primary(&engine).await;
        gateway.fail_next(GatewayOperation::MemberRoles);

        let result = dispatcher.dispatch(&click(CLOSE_QUEUE, "admin", &post), &ctx).await;

        assert!(matches!(result, Ok(HandlerResult::Responded(_))));
        assert!(engine.snapshot().await.is_open());
    }

    #[tokio::test]
    async fn open_button_on_closed_post_starts_new_queue() {
        let (gateway, engine, dispatcher) = queue_fixture();
        let ctx = EventContext::default();
        dispatcher.dispatch(&slash("standby", "u1"), &ctx).await.expect("dispatch");
        let old_post = primary(&engine).await;
        dispatcher.dispatch(&click(CLOSE_QUEUE, "admin", &old_post), &ctx).await.expect("close");

        let result = dispatcher.dispatch(&click(OPEN_QUEUE, "u3", &old_post), &ctx).await;

        assert_eq!(result, Ok(HandlerResult::Processed));
        assert_eq!(engine.snapshot().await.participants(), &[UserRef::new("u3")]);
        assert!(gateway.live_message(&old_post).is_none());
        assert_ne!(primary(&engine).await, old_post);
    }

    #[tokio::test]
    async fn unknown_custom_id_is_a_handler_error() {
        let (_gateway, engine, dispatcher) = queue_fixture();
        let ctx = EventContext::default();
        let outcome = engine.open().await.expect("open");
        let QueueOutcome::Opened { primary } = outcome else {
            panic!("expected opened outcome");
        };

        let result = dispatcher.dispatch(&click("mystery", "u1", &primary), &ctx).await;

        assert_eq!(
            result,
            Err(DispatchError::Handler(EventHandlerError::UnknownButton("mystery".to_owned())))
        );
    }

    #[tokio::test]
    async fn unsupported_events_are_ignored() {
        let (_gateway, _engine, dispatcher) = queue_fixture();
        let envelope = InteractionEnvelope {
            interaction_id: "i-1".to_owned(),
            token: "token".to_owned(),
            event: DiscordEvent::Unsupported { event_type: "autocomplete".to_owned() },
        };

        let result = dispatcher.dispatch(&envelope, &EventContext::default()).await;

        assert_eq!(result, Ok(HandlerResult::Ignored));
        assert_eq!(dispatcher.handler_count(), 2);
    }

    #[tokio::test]
    async fn roster_dispatcher_toggles_and_purges() {
        let gateway = Arc::new(InMemoryGateway::with_members(vec![
            member("admin", &[ADMIN_ROLE]),
            member("u1", &[]),
        ]));
        let roster = Arc::new(StandbyRoster::new(
            gateway.clone(),
            gateway.clone(),
            RosterSettings {
                guild: GuildId::new("G1"),
                channel: ChannelId::new("C1"),
                standby_role: RoleId::new("800"),
                admin_role: RoleId::new(ADMIN_ROLE),
                threshold: 5,
            },
        ));
        let dispatcher = roster_dispatcher(roster.clone(), "G1");
        let ctx = EventContext::default();

        let toggled = dispatcher.dispatch(&slash("standby", "u1"), &ctx).await.expect("dispatch");
        let HandlerResult::Responded(reply) = toggled else {
            panic!("expected reply");
        };
        assert!(reply.ephemeral);
        assert!(reply.content.contains("5 users"));

        let denied =
            dispatcher.dispatch(&slash("standby-purge", "u1"), &ctx).await.expect("dispatch");
        let HandlerResult::Responded(reply) = denied else {
            panic!("expected rejection");
        };
        assert_eq!(reply.content, "Only admins can use this command.");

        let purged =
            dispatcher.dispatch(&slash("standby-purge", "admin"), &ctx).await.expect("dispatch");
        let HandlerResult::Responded(reply) = purged else {
            panic!("expected purge report");
        };
        assert_eq!(reply.content, "Standby members purged (1 removed).");
        assert!(!reply.ephemeral);
        assert_eq!(roster.standby_count().await, Ok(0));
    }

    #[test]
    fn purge_summary_reports_removed_and_failed_counts() {
        assert_eq!(
            purge_summary(&PurgeReport { removed: 0, failed: 0 }),
            "Standby members purged (0 removed)."
        );
        assert_eq!(
            purge_summary(&PurgeReport { removed: 3, failed: 2 }),
            "Standby members purged (3 removed, 2 could not be removed)."
        );
    }

    #[test]
    fn decodes_slash_command_and_button_interactions() {
        let slash = decode_interaction(
            r#"{"id": "i1", "token": "t1", "type": 2, "guild_id": "G1", "channel_id": "C1",
                "member": {"user": {"id": "u1"}, "roles": []}, "data": {"name": "standby"}}"#,
        )
        .expect("slash decodes");
        assert_eq!(slash.interaction_id, "i1");
        assert_eq!(
            slash.event,
            DiscordEvent::SlashCommand(SlashCommandPayload {
                name: "standby".to_owned(),
                user_id: "u1".to_owned(),
                channel_id: "C1".to_owned(),
                guild_id: Some("G1".to_owned()),
            })
        );

        let click = decode_interaction(
            r#"{"id": "i2", "token": "t2", "type": 3, "channel_id": "C1",
                "member": {"user": {"id": "u2"}}, "message": {"id": "M9"},
                "data": {"custom_id": "join_queue", "component_type": 2}}"#,
        )
        .expect("click decodes");
        assert_eq!(
            click.event,
            DiscordEvent::ButtonClick(ButtonClickEvent {
                custom_id: JOIN_QUEUE.to_owned(),
                user_id: "u2".to_owned(),
                channel_id: "C1".to_owned(),
                message_id: "M9".to_owned(),
            })
        );
    }

    #[test]
    fn pings_decode_and_incomplete_payloads_are_unsupported() {
        let ping = decode_interaction(r#"{"id": "i3", "token": "t3", "type": 1}"#).expect("ping");
        assert_eq!(ping.event, DiscordEvent::Ping);
        assert_eq!(ping.event.user_id(), None);

        let autocomplete = decode_interaction(
            r#"{"id": "i5", "token": "t5", "type": 4, "channel_id": "C1", "user": {"id": "u1"}}"#,
        )
        .expect("decodes");
        assert_eq!(
            autocomplete.event,
            DiscordEvent::Unsupported { event_type: "interaction_type_4".to_owned() }
        );

        let missing_message = decode_interaction(
            r#"{"id": "i4", "token": "t4", "type": 3, "channel_id": "C1",
                "user": {"id": "u1"}, "data": {"custom_id": "join_queue"}}"#,
        )
        .expect("decodes");
        assert!(matches!(missing_message.event, DiscordEvent::Unsupported { .. }));

        assert!(decode_interaction("not json").is_err());
    }
}
