//! Inbound side of the HTTP interactions endpoint.
//!
//! Discord posts each interaction to the bot's public URL as a signed request and expects
//! the interaction response as the HTTP answer. [`SignatureVerifier`] checks the request,
//! and [`InteractionInbox`] carries the decoded envelope to the [`GatewayRunner`] while
//! routing the runner's acknowledgement back to the waiting request.
//!
//! [`GatewayRunner`]: crate::socket::GatewayRunner

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::debug;

use crate::components::{InteractionCallback, InteractionReply};
use crate::events::InteractionEnvelope;
use crate::socket::{InteractionResponder, InteractionTransport, TransportError};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";
pub const DEFAULT_INBOX_CAPACITY: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid ed25519 public key: {0}")]
    PublicKey(String),
    #[error("request signature is malformed")]
    Malformed,
    #[error("request signature does not match")]
    Mismatch,
}

/// Verifies Discord request signatures against the application's public key.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|error| SignatureError::PublicKey(error.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignatureError::PublicKey("expected 32 bytes".to_owned()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|error| SignatureError::PublicKey(error.to_string()))?;
        Ok(Self { key })
    }

    /// Checks the hex `signature` over `timestamp` followed by the raw request body.
    pub fn verify(
        &self,
        signature: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let bytes = hex::decode(signature.trim()).map_err(|_| SignatureError::Malformed)?;
        let signature = Signature::from_slice(&bytes).map_err(|_| SignatureError::Malformed)?;

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).map_err(|_| SignatureError::Mismatch)
    }
}

/// Channel-backed transport fed by the HTTP endpoint.
///
/// Acknowledgements for submitted interactions resolve the submitter's receiver; anything
/// else, and every follow-up, goes through `fallback`.
pub struct InteractionInbox {
    sender: Mutex<Option<mpsc::Sender<InteractionEnvelope>>>,
    receiver: Mutex<mpsc::Receiver<InteractionEnvelope>>,
    pending: Mutex<HashMap<String, oneshot::Sender<InteractionCallback>>>,
    fallback: Arc<dyn InteractionResponder>,
}

impl InteractionInbox {
    pub fn new(capacity: usize, fallback: Arc<dyn InteractionResponder>) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
            pending: Mutex::new(HashMap::new()),
            fallback,
        }
    }

    /// Queues `envelope` for the runner and returns the receiver for its acknowledgement.
    pub async fn submit(
        &self,
        envelope: InteractionEnvelope,
    ) -> Result<oneshot::Receiver<InteractionCallback>, TransportError> {
        let sender = self.sender.lock().await.clone().ok_or(TransportError::Closed)?;
        let interaction_id = envelope.interaction_id.clone();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(interaction_id.clone(), reply_tx);

        if sender.send(envelope).await.is_err() {
            self.pending.lock().await.remove(&interaction_id);
            return Err(TransportError::Closed);
        }
        Ok(reply_rx)
    }

    /// Drops the waiting slot for an interaction whose request gave up.
    pub async fn forget(&self, interaction_id: &str) {
        self.pending.lock().await.remove(interaction_id);
    }

    /// Stops accepting interactions. The runner drains what is queued, then its stream ends.
    pub async fn close(&self) {
        if self.sender.lock().await.take().is_some() {
            debug!(event_name = "ingress.discord.inbox_closed", "interaction inbox closed");
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[async_trait]
impl InteractionTransport for InteractionInbox {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.sender.lock().await.is_none() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    async fn next_interaction(&self) -> Result<Option<InteractionEnvelope>, TransportError> {
        Ok(self.receiver.lock().await.recv().await)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl InteractionResponder for InteractionInbox {
    async fn acknowledge(
        &self,
        envelope: &InteractionEnvelope,
        callback: &InteractionCallback,
    ) -> Result<(), TransportError> {
        let waiting = self.pending.lock().await.remove(&envelope.interaction_id);
        match waiting {
            Some(reply) => reply.send(callback.clone()).map_err(|_| {
                TransportError::Acknowledge("interaction request already answered".to_owned())
            }),
            None => self.fallback.acknowledge(envelope, callback).await,
        }
    }

    async fn follow_up(
        &self,
        envelope: &InteractionEnvelope,
        reply: &InteractionReply,
    ) -> Result<(), TransportError> {
        self.fallback.follow_up(envelope, reply).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use ed25519_dalek::{Signer, SigningKey};
    use tokio::sync::Mutex;

    use super::{InteractionInbox, SignatureError, SignatureVerifier};
    use crate::commands::SlashCommandPayload;
    use crate::components::{InteractionCallback, InteractionReply};
    use crate::events::{DiscordEvent, EventDispatcher, InteractionEnvelope};
    use crate::socket::{
        GatewayRunner, InteractionResponder, InteractionTransport, ReconnectPolicy, TransportError,
    };

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7_u8; 32])
    }

    fn verifier() -> SignatureVerifier {
        let public_key = hex::encode(signing_key().verifying_key().to_bytes());
        SignatureVerifier::from_hex(&public_key).expect("valid key")
    }

    fn sign(timestamp: &str, body: &str) -> String {
        let message = format!("{timestamp}{body}");
        hex::encode(signing_key().sign(message.as_bytes()).to_bytes())
    }

    #[derive(Default)]
    struct CountingResponder {
        acknowledged: Mutex<Vec<String>>,
        followed_up: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InteractionResponder for CountingResponder {
        async fn acknowledge(
            &self,
            envelope: &InteractionEnvelope,
            _callback: &InteractionCallback,
        ) -> Result<(), TransportError> {
            self.acknowledged.lock().await.push(envelope.interaction_id.clone());
            Ok(())
        }

        async fn follow_up(
            &self,
            envelope: &InteractionEnvelope,
            _reply: &InteractionReply,
        ) -> Result<(), TransportError> {
            self.followed_up.lock().await.push(envelope.interaction_id.clone());
            Ok(())
        }
    }

    fn slash(interaction_id: &str) -> InteractionEnvelope {
        InteractionEnvelope {
            interaction_id: interaction_id.to_owned(),
            token: "token".to_owned(),
            event: DiscordEvent::SlashCommand(SlashCommandPayload {
                name: "standby".to_owned(),
                user_id: "U1".to_owned(),
                channel_id: "C1".to_owned(),
                guild_id: None,
            }),
        }
    }

    #[test]
    fn signed_requests_verify_and_tampering_is_rejected() {
        let verifier = verifier();
        let body = r#"{"type":1}"#;
        let signature = sign("1700000000", body);

        assert_eq!(verifier.verify(&signature, "1700000000", body.as_bytes()), Ok(()));
        assert_eq!(
            verifier.verify(&signature, "1700000001", body.as_bytes()),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier.verify(&signature, "1700000000", br#"{"type":2}"#),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier.verify("not-hex", "1700000000", body.as_bytes()),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verifier.verify("abcd", "1700000000", body.as_bytes()),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn public_key_must_be_32_hex_bytes() {
        assert!(matches!(SignatureVerifier::from_hex("zz"), Err(SignatureError::PublicKey(_))));
        assert!(matches!(
            SignatureVerifier::from_hex(&"ab".repeat(16)),
            Err(SignatureError::PublicKey(_))
        ));
    }

    #[tokio::test]
    async fn acknowledgement_resolves_the_submitted_request() {
        let fallback = Arc::new(CountingResponder::default());
        let inbox = InteractionInbox::new(4, fallback.clone());

        let waiting = inbox.submit(slash("i-1")).await.expect("submit");
        let received = inbox.next_interaction().await.expect("receive").expect("envelope");
        assert_eq!(received.interaction_id, "i-1");

        inbox
            .acknowledge(&received, &InteractionCallback::reply(&InteractionReply::ephemeral("ok")))
            .await
            .expect("acknowledge");

        let callback = waiting.await.expect("callback delivered");
        assert_eq!(callback.kind, 4);
        assert_eq!(inbox.pending_count().await, 0);
        assert!(fallback.acknowledged.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_acknowledgements_and_follow_ups_use_the_fallback() {
        let fallback = Arc::new(CountingResponder::default());
        let inbox = InteractionInbox::new(4, fallback.clone());

        let waiting = inbox.submit(slash("i-2")).await.expect("submit");
        inbox.forget("i-2").await;
        drop(waiting);

        let envelope = slash("i-2");
        inbox.acknowledge(&envelope, &InteractionCallback::deferred_update()).await.expect("ack");
        inbox.follow_up(&envelope, &InteractionReply::ephemeral("later")).await.expect("follow-up");

        assert_eq!(*fallback.acknowledged.lock().await, vec!["i-2".to_owned()]);
        assert_eq!(*fallback.followed_up.lock().await, vec!["i-2".to_owned()]);
    }

    #[tokio::test]
    async fn closing_ends_the_stream_and_rejects_new_submissions() {
        let inbox = InteractionInbox::new(4, Arc::new(CountingResponder::default()));
        let _queued = inbox.submit(slash("i-3")).await.expect("submit");

        inbox.close().await;

        assert!(inbox.next_interaction().await.expect("receive").is_some());
        assert_eq!(inbox.next_interaction().await.expect("receive"), None);
        assert_eq!(inbox.submit(slash("i-4")).await.err(), Some(TransportError::Closed));
        assert_eq!(inbox.connect().await, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn runner_answers_submitted_slash_commands_until_closed() {
        let inbox = Arc::new(InteractionInbox::new(4, Arc::new(CountingResponder::default())));
        let runner = GatewayRunner::new(
            inbox.clone(),
            inbox.clone(),
            EventDispatcher::default(),
            ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
        );
        let running = tokio::spawn(async move { runner.start().await });

        let waiting = inbox.submit(slash("i-5")).await.expect("submit");
        let callback = waiting.await.expect("runner acknowledged");
        assert_eq!(callback.kind, 4);

        inbox.close().await;
        running.await.expect("join").expect("runner stops cleanly");
    }
}
