//! Webhook endpoints for channel integrations

use std::sync::Arc;

use axum::{Router, routing::post};

use super::ApiState;

pub mod whatsapp;

/// Build webhooks router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/whatsapp", post(whatsapp::handle_notification))
        .with_state(state)
}
