//! HTTP API server for the pokerlog gateway

pub mod health;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::db::DbPool;
use crate::router::ConversationRouter;

/// Shared state for API handlers
pub struct ApiState {
    pub db: DbPool,
    pub router: ConversationRouter,
    /// Expected bearer token on webhook calls
    pub webhook_token: Option<SecretString>,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// Routes for the given state
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .nest("/api/webhooks", webhooks::router(state.clone()))
        .merge(health::router())
        .merge(health::ready_router(state))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
