//! `WhatsApp` gateway webhook handler

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use futures::FutureExt;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::api::ApiState;
use crate::channels::WhatsAppWebhook;

/// Webhook response body
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
}

fn respond(status: StatusCode, success: bool) -> (StatusCode, Json<WebhookResponse>) {
    (status, Json(WebhookResponse { success }))
}

/// Handle a gateway notification
///
/// * 401 when a webhook token is configured and the bearer token differs
/// * 400 for malformed JSON or a message missing required fields
/// * 200 with `success: true` for notifications that are not routed
/// * 200 with `success` equal to the delivery result for routed messages
/// * 500 if routing panics
pub async fn handle_notification(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<WhatsAppWebhook>, JsonRejection>,
) -> (StatusCode, Json<WebhookResponse>) {
    if !authorized(&state, &headers) {
        tracing::warn!("rejected webhook with bad or missing token");
        return respond(StatusCode::UNAUTHORIZED, false);
    }

    let Json(webhook) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "malformed webhook payload");
            return respond(StatusCode::BAD_REQUEST, false);
        }
    };

    tracing::debug!(
        type_webhook = %webhook.type_webhook,
        id_message = webhook.id_message.as_deref().unwrap_or_default(),
        "received WhatsApp webhook"
    );

    let event = match webhook.into_event() {
        Ok(Some(event)) => event,
        Ok(None) => return respond(StatusCode::OK, true),
        Err(e) => {
            tracing::warn!(error = %e, "unusable WhatsApp message");
            return respond(StatusCode::BAD_REQUEST, false);
        }
    };

    match AssertUnwindSafe(state.router.handle(event)).catch_unwind().await {
        Ok(outcome) => respond(StatusCode::OK, outcome.delivered),
        Err(_) => {
            tracing::error!("routing panicked");
            respond(StatusCode::INTERNAL_SERVER_ERROR, false)
        }
    }
}

fn authorized(state: &ApiState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.webhook_token else {
        return true;
    };

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token.trim() == expected.expose_secret())
}
