use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use standby_discord::components::{InteractionCallback, InteractionReply};
use standby_discord::events::{decode_interaction, DiscordEvent};
use standby_discord::inbound::{
    InteractionInbox, SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use tracing::{debug, warn};

/// Discord drops an interaction that is not answered within three seconds.
pub const RESPONSE_WINDOW: Duration = Duration::from_millis(2_800);

#[derive(Clone)]
pub struct InteractionsState {
    pub verifier: Arc<SignatureVerifier>,
    pub inbox: Arc<InteractionInbox>,
    pub response_window: Duration,
}

pub fn router(state: InteractionsState) -> Router {
    Router::new().route("/interactions", post(receive)).with_state(state)
}

pub async fn receive(
    State(state): State<InteractionsState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (Some(signature), Some(timestamp)) =
        (header(&headers, SIGNATURE_HEADER), header(&headers, TIMESTAMP_HEADER))
    else {
        return (StatusCode::UNAUTHORIZED, "missing request signature").into_response();
    };
    if let Err(error) = state.verifier.verify(signature, timestamp, &body) {
        warn!(
            event_name = "ingress.discord.signature_rejected",
            error = %error,
            "rejected interaction request"
        );
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let Ok(text) = std::str::from_utf8(&body) else {
        return (StatusCode::BAD_REQUEST, "body is not utf-8").into_response();
    };
    let envelope = match decode_interaction(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(
                event_name = "ingress.discord.decode_failed",
                error = %error,
                "failed to decode interaction body"
            );
            return (StatusCode::BAD_REQUEST, "malformed interaction").into_response();
        }
    };

    match &envelope.event {
        DiscordEvent::Ping => return Json(InteractionCallback::pong()).into_response(),
        DiscordEvent::Unsupported { event_type } => {
            debug!(
                correlation_id = %envelope.interaction_id,
                event_type = %event_type,
                "answering unsupported interaction"
            );
            let reply = InteractionReply::ephemeral("This interaction is not supported.");
            return Json(InteractionCallback::reply(&reply)).into_response();
        }
        DiscordEvent::SlashCommand(_) | DiscordEvent::ButtonClick(_) => {}
    }

    let interaction_id = envelope.interaction_id.clone();
    let waiting = match state.inbox.submit(envelope).await {
        Ok(waiting) => waiting,
        Err(error) => {
            warn!(
                event_name = "ingress.discord.inbox_rejected",
                correlation_id = %interaction_id,
                error = %error,
                "interaction inbox is not accepting requests"
            );
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    match tokio::time::timeout(state.response_window, waiting).await {
        Ok(Ok(callback)) => Json(callback).into_response(),
        Ok(Err(_)) => {
            warn!(
                event_name = "ingress.discord.response_dropped",
                correlation_id = %interaction_id,
                "interaction finished without a response"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(_) => {
            state.inbox.forget(&interaction_id).await;
            warn!(
                event_name = "ingress.discord.response_timeout",
                correlation_id = %interaction_id,
                window_ms = state.response_window.as_millis() as u64,
                "interaction was not answered in time"
            );
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
