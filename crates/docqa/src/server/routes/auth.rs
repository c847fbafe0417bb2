//! Login, logout, and profile endpoints

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::server::auth::AuthSession;
use crate::server::state::AppState;

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub is_admin: bool,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub is_admin: bool,
    pub login_time: DateTime<Utc>,
    pub active_document: Option<uuid::Uuid>,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let session = state.login(&request.username, &request.password)?;

    Ok(Json(LoginResponse {
        access_token: session.token,
        token_type: "bearer",
        user: UserInfo {
            username: session.username,
            is_admin: session.is_admin,
        },
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Json<serde_json::Value> {
    state.logout(&session.token);
    Json(serde_json::json!({ "message": "Successfully logged out" }))
}

/// GET /api/user/profile
pub async fn profile(AuthSession(session): AuthSession) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        username: session.username,
        is_admin: session.is_admin,
        login_time: session.created_at,
        active_document: session.active_document,
    })
}
