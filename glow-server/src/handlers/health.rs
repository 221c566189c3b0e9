//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: String,
    /// Server version from Cargo.toml
    pub version: String,
    /// Whether the ledger handle is open
    pub ledger_open: bool,
    /// Service name
    pub service: String,
}

/// Service health
///
/// Returns service status, version, and whether the ledger handle is open.
/// Used for monitoring and load balancer health checks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger_open = !state.notary.is_closed();

    Json(HealthResponse {
        status: if ledger_open { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger_open,
        service: "glow-server".to_string(),
    })
}

/// Readiness response for orchestrators
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness check
///
/// Ready while the ledger handle is open. Verification needs no bound
/// topic, so an unbound notary is still ready.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses((status = 200, description = "Readiness", body = ReadyResponse))
)]
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    if state.notary.is_closed() {
        Json(ReadyResponse {
            ready: false,
            message: Some("Ledger handle is closed".to_string()),
        })
    } else {
        Json(ReadyResponse {
            ready: true,
            message: None,
        })
    }
}
