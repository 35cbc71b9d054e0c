use std::sync::Arc;

use standby_core::config::{AppConfig, QueueMode};
use standby_core::gateway::{NotificationGateway, RoleDirectory, RoleResolver};
use standby_core::queue::QueueEngine;
use standby_core::roster::{RosterSettings, StandbyRoster};
use standby_discord::commands::command_definitions;
use standby_discord::events::{queue_dispatcher, roster_dispatcher, AdminCheck, EventDispatcher};
use standby_discord::inbound::{
    InteractionInbox, SignatureError, SignatureVerifier, DEFAULT_INBOX_CAPACITY,
};
use standby_discord::rest::DiscordRestClient;
use standby_discord::socket::{GatewayRunner, InteractionResponder, ReconnectPolicy};
use thiserror::Error;
use tracing::{info, warn};

/// The bot variant the process is running.
#[derive(Clone)]
pub enum ModeRuntime {
    Queue(Arc<QueueEngine>),
    Roster(Arc<StandbyRoster>),
}

impl ModeRuntime {
    pub fn mode(&self) -> QueueMode {
        match self {
            Self::Queue(_) => QueueMode::Queue,
            Self::Roster(_) => QueueMode::Roster,
        }
    }
}

pub struct Application {
    pub config: AppConfig,
    pub rest: Arc<DiscordRestClient>,
    pub runtime: ModeRuntime,
    pub verifier: Arc<SignatureVerifier>,
    /// Feeds the runner from the `/interactions` endpoint; closing it stops the runner.
    pub inbox: Arc<InteractionInbox>,
    pub runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("roster mode needs discord.standby_role_id")]
    MissingStandbyRole,
    #[error(transparent)]
    PublicKey(#[from] SignatureError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        mode = ?config.queue.mode,
        "starting application bootstrap"
    );

    let verifier = Arc::new(SignatureVerifier::from_hex(&config.discord.public_key)?);
    let rest = Arc::new(DiscordRestClient::new(
        config.discord.api_base_url.clone(),
        config.discord.bot_token.clone(),
        config.discord.application_id.clone(),
    ));

    let (runtime, dispatcher) = assemble(&config, rest.clone(), rest.clone())?;
    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        "interaction handlers registered"
    );

    let (inbox, runner) = interaction_runner(dispatcher, rest.clone());

    Ok(Application { config, rest, runtime, verifier, inbox, runner })
}

/// Builds the runner over an inbox; acknowledgements the inbox cannot answer in-band, and
/// all follow-ups, go to `fallback`.
pub fn interaction_runner(
    dispatcher: EventDispatcher,
    fallback: Arc<dyn InteractionResponder>,
) -> (Arc<InteractionInbox>, GatewayRunner) {
    let inbox = Arc::new(InteractionInbox::new(DEFAULT_INBOX_CAPACITY, fallback));
    let runner =
        GatewayRunner::new(inbox.clone(), inbox.clone(), dispatcher, ReconnectPolicy::default());
    (inbox, runner)
}

/// Builds the mode runtime and its interaction dispatcher over the given collaborators.
pub fn assemble<D>(
    config: &AppConfig,
    gateway: Arc<dyn NotificationGateway>,
    directory: Arc<D>,
) -> Result<(ModeRuntime, EventDispatcher), BootstrapError>
where
    D: RoleDirectory + 'static,
{
    let discord = &config.discord;

    match config.queue.mode {
        QueueMode::Queue => {
            let engine =
                Arc::new(QueueEngine::new(gateway, discord.channel(), config.queue.policy()));
            let close_guard = config.queue.admin_only_close.then(|| {
                let resolver: Arc<dyn RoleResolver> = directory.clone();
                AdminCheck::new(resolver, discord.guild(), discord.admin_role())
            });
            let dispatcher =
                queue_dispatcher(engine.clone(), discord.guild_id.clone(), close_guard);
            Ok((ModeRuntime::Queue(engine), dispatcher))
        }
        QueueMode::Roster => {
            let standby_role = discord.standby_role().ok_or(BootstrapError::MissingStandbyRole)?;
            let roster = Arc::new(StandbyRoster::new(
                directory,
                gateway,
                RosterSettings {
                    guild: discord.guild(),
                    channel: discord.channel(),
                    standby_role,
                    admin_role: discord.admin_role(),
                    threshold: config.queue.capacity,
                },
            ));
            let dispatcher = roster_dispatcher(roster.clone(), discord.guild_id.clone());
            Ok((ModeRuntime::Roster(roster), dispatcher))
        }
    }
}

/// Registers the mode's guild slash commands. Failures are logged; the bot keeps running.
pub async fn register_commands(app: &Application) {
    let commands = command_definitions(app.runtime.mode());
    if let Err(error) =
        app.rest.register_guild_commands(&app.config.discord.guild(), &commands).await
    {
        warn!(
            event_name = "system.bootstrap.command_registration_failed",
            correlation_id = "bootstrap",
            error = %error,
            "failed to register guild slash commands"
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use standby_core::config::{AppConfig, QueueMode};
    use standby_core::domain::member::UserRef;
    use standby_core::gateway::InMemoryGateway;
    use standby_discord::events::decode_interaction;
    use standby_discord::socket::NoopInteractionResponder;

    use super::{
        assemble, bootstrap_with_config, interaction_runner, BootstrapError, ModeRuntime,
    };

    pub(crate) fn valid_config(mode: QueueMode) -> AppConfig {
        let mut config = AppConfig::default();
        config.discord.bot_token = "test-token".to_owned().into();
        config.discord.application_id = "100".to_owned();
        config.discord.public_key = "5866666666666666666666666666666666666666666666666666666666666666".to_owned();
        config.discord.guild_id = "200".to_owned();
        config.discord.channel_id = "300".to_owned();
        config.discord.admin_role_id = "400".to_owned();
        config.discord.standby_role_id = Some("500".to_owned());
        config.queue.mode = mode;
        config
    }

    #[tokio::test]
    async fn queue_mode_assembles_engine_with_both_handlers() {
        let gateway = Arc::new(InMemoryGateway::default());
        let (runtime, dispatcher) =
            assemble(&valid_config(QueueMode::Queue), gateway.clone(), gateway.clone())
                .expect("assemble");

        let ModeRuntime::Queue(engine) = runtime else {
            panic!("expected queue runtime");
        };
        assert_eq!(dispatcher.handler_count(), 2);
        assert_eq!(engine.channel().as_str(), "300");

        engine.start(UserRef::new("u1")).await.expect("start");
        assert_eq!(gateway.live_count(), 1);
    }

    #[tokio::test]
    async fn roster_mode_uses_capacity_as_threshold() {
        let mut config = valid_config(QueueMode::Roster);
        config.queue.capacity = 3;
        let gateway = Arc::new(InMemoryGateway::default());

        let (runtime, dispatcher) = assemble(&config, gateway.clone(), gateway).expect("assemble");

        let ModeRuntime::Roster(roster) = runtime else {
            panic!("expected roster runtime");
        };
        assert_eq!(dispatcher.handler_count(), 1);
        assert_eq!(roster.settings().threshold, 3);
        assert_eq!(roster.settings().standby_role.as_str(), "500");
    }

    #[test]
    fn roster_mode_without_standby_role_is_rejected() {
        let mut config = valid_config(QueueMode::Roster);
        config.discord.standby_role_id = None;
        let gateway = Arc::new(InMemoryGateway::default());

        let result = assemble(&config, gateway.clone(), gateway);

        assert!(matches!(result, Err(BootstrapError::MissingStandbyRole)));
    }

    #[tokio::test]
    async fn bootstrap_wires_rest_client_from_config() {
        let mut config = valid_config(QueueMode::Queue);
        config.discord.api_base_url = "http://127.0.0.1:9/api/v10/".to_owned();

        let app = bootstrap_with_config(config).await.expect("bootstrap");

        assert_eq!(app.rest.base_url(), "http://127.0.0.1:9/api/v10");
        assert_eq!(app.runtime.mode(), QueueMode::Queue);
        assert_eq!(app.inbox.pending_count().await, 0);
    }

    #[tokio::test]
    async fn bootstrap_rejects_an_unusable_public_key() {
        let mut config = valid_config(QueueMode::Queue);
        config.discord.public_key = "00".repeat(31);

        let result = bootstrap_with_config(config).await;

        assert!(matches!(result, Err(BootstrapError::PublicKey(_))));
    }

    #[tokio::test]
    async fn interactions_pushed_into_the_inbox_reach_the_engine() {
        let gateway = Arc::new(InMemoryGateway::default());
        let (runtime, dispatcher) =
            assemble(&valid_config(QueueMode::Queue), gateway.clone(), gateway.clone())
                .expect("assemble");
        let ModeRuntime::Queue(engine) = runtime else {
            panic!("expected queue runtime");
        };
        let (inbox, runner) = interaction_runner(dispatcher, Arc::new(NoopInteractionResponder));
        let running = tokio::spawn(async move { runner.start().await });

        let slash = decode_interaction(
            r#"{"id": "i-1", "token": "t", "type": 2, "guild_id": "200", "channel_id": "300",
                "member": {"user": {"id": "u1"}}, "data": {"name": "standby"}}"#,
        )
        .expect("slash decodes");
        let callback = inbox.submit(slash).await.expect("submit").await.expect("answered");
        assert_eq!(callback.kind, 4);
        assert!(engine.snapshot().await.is_open());
        assert_eq!(gateway.live_count(), 1);

        let post = engine.snapshot().await.primary_message().cloned().expect("live queue post");
        let join = decode_interaction(&format!(
            r#"{{"id": "i-2", "token": "t", "type": 3, "channel_id": "300",
                "member": {{"user": {{"id": "u2"}}}}, "message": {{"id": "{post}"}},
                "data": {{"custom_id": "join_queue"}}}}"#
        ))
        .expect("click decodes");
        let deferred = inbox.submit(join).await.expect("submit").await.expect("answered");
        assert_eq!(deferred.kind, 6);

        inbox.close().await;
        running.await.expect("join").expect("runner stops after close");
        assert_eq!(engine.snapshot().await.participants().len(), 2);
        assert!(gateway.calls().len() >= 2);
    }
}
