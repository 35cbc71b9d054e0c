use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::components::{InteractionCallback, InteractionReply};
use crate::events::{
    DiscordEvent, EventContext, EventDispatcher, HandlerResult, InteractionEnvelope,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("interaction callback failed: {0}")]
    Acknowledge(String),
    #[error("interaction follow-up failed: {0}")]
    FollowUp(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
    #[error("interaction inbox is closed")]
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Inbound side: a stream of interactions from Discord.
#[async_trait]
pub trait InteractionTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_interaction(&self) -> Result<Option<InteractionEnvelope>, TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Outbound side: interaction callbacks and follow-up messages.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn acknowledge(
        &self,
        envelope: &InteractionEnvelope,
        callback: &InteractionCallback,
    ) -> Result<(), TransportError>;

    async fn follow_up(
        &self,
        envelope: &InteractionEnvelope,
        reply: &InteractionReply,
    ) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopInteractionResponder;

#[async_trait]
impl InteractionResponder for NoopInteractionResponder {
    async fn acknowledge(
        &self,
        _envelope: &InteractionEnvelope,
        _callback: &InteractionCallback,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn follow_up(
        &self,
        _envelope: &InteractionEnvelope,
        _reply: &InteractionReply,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct GatewayRunner {
    transport: Arc<dyn InteractionTransport>,
    responder: Arc<dyn InteractionResponder>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn InteractionTransport>,
        responder: Arc<dyn InteractionResponder>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, responder, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "interaction transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "interaction transport retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening interaction transport connection");
        self.transport.connect().await?;
        info!(attempt, "interaction transport connected");

        let mut in_flight = JoinSet::new();
        let pumped = loop {
            let envelope = match self.transport.next_interaction().await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            };

            info!(
                event_name = "ingress.discord.interaction_received",
                interaction_id = %envelope.interaction_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.interaction_id,
                user_id = envelope.event.user_id().unwrap_or("unknown"),
                "received discord interaction"
            );

            in_flight.spawn(handle_interaction(
                self.dispatcher.clone(),
                self.responder.clone(),
                envelope,
            ));
        };

        while let Some(joined) = in_flight.join_next().await {
            if let Err(error) = joined {
                warn!(error = %error, "interaction task panicked");
            }
        }

        pumped?;
        info!(attempt, "interaction transport stream closed");
        self.transport.disconnect().await
    }
}

async fn handle_interaction(
    dispatcher: Arc<EventDispatcher>,
    responder: Arc<dyn InteractionResponder>,
    envelope: InteractionEnvelope,
) {
    let context = EventContext { correlation_id: envelope.interaction_id.clone() };

    match &envelope.event {
        DiscordEvent::ButtonClick(_) => {
            // Discord expects an answer within three seconds; the queue post edit is the reply.
            acknowledge(&*responder, &envelope, &InteractionCallback::deferred_update()).await;

            match dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded(reply)) => {
                    if let Err(error) = responder.follow_up(&envelope, &reply).await {
                        warn!(
                            event_name = "ingress.discord.follow_up_failed",
                            correlation_id = %context.correlation_id,
                            error = %error,
                            "failed to send interaction follow-up"
                        );
                    }
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => warn!(
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "event dispatch failed; continuing interaction loop"
                ),
            }
        }
        DiscordEvent::SlashCommand(_) => {
            let reply = match dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded(reply)) => reply,
                Ok(HandlerResult::Processed) => InteractionReply::ephemeral("Done."),
                Ok(HandlerResult::Ignored) => {
                    InteractionReply::ephemeral("This command is not available here.")
                }
                Err(error) => {
                    warn!(
                        correlation_id = %context.correlation_id,
                        error = %error,
                        "event dispatch failed; continuing interaction loop"
                    );
                    InteractionReply::ephemeral("Something went wrong. Please try again.")
                }
            };
            acknowledge(&*responder, &envelope, &InteractionCallback::reply(&reply)).await;
        }
        DiscordEvent::Ping => {
            debug!(correlation_id = %context.correlation_id, "ping reached the interaction loop");
        }
        DiscordEvent::Unsupported { event_type } => {
            debug!(
                correlation_id = %context.correlation_id,
                event_type = %event_type,
                "ignoring unsupported interaction"
            );
        }
    }
}

async fn acknowledge(
    responder: &dyn InteractionResponder,
    envelope: &InteractionEnvelope,
    callback: &InteractionCallback,
) {
    match responder.acknowledge(envelope, callback).await {
        Ok(()) => debug!(
            event_name = "ingress.discord.ack_sent",
            correlation_id = %envelope.interaction_id,
            callback_type = callback.kind,
            "acknowledged discord interaction"
        ),
        Err(error) => warn!(
            event_name = "ingress.discord.ack_sent",
            correlation_id = %envelope.interaction_id,
            error = %error,
            "failed to acknowledge discord interaction"
        ),
    }
}
