//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub database: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }
}

/// Liveness check - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check - can the service reach its database?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = check_database(&state);
    let all_ok = database.status == "ok";

    let http_status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(ReadinessResponse {
            status: if all_ok { "ok" } else { "degraded" },
            checks: ReadinessChecks { database },
        }),
    )
}

fn check_database(state: &ApiState) -> CheckResult {
    match state.db.get() {
        Ok(conn) => match conn.query_row("SELECT 1", [], |_| Ok(())) {
            Ok(()) => CheckResult::ok(),
            Err(e) => CheckResult::fail(format!("query failed: {e}")),
        },
        Err(e) => CheckResult::fail(format!("connection failed: {e}")),
    }
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
