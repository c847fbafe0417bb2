//! Health and system status endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::auth::AuthSession;
use crate::server::state::{AppState, SystemStatus};

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/system/status - Admin only
pub async fn status(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<SystemStatus>> {
    state.system_status(&session).await.map(Json)
}
