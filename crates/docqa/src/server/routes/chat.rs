//! Chat history endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::server::auth::AuthSession;
use crate::server::state::AppState;
use crate::types::{ChatTurn, ConversationSummary};

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<ConversationSummary>,
}

/// GET /api/chat/history/:session_id
pub async fn history(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let messages = state.chat_history(&session, &session_id);
    Json(HistoryResponse {
        session_id,
        messages,
    })
}

/// GET /api/chat/sessions
pub async fn sessions(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.chat_sessions(&session),
    })
}

/// DELETE /api/chat/history/:session_id
pub async fn clear_history(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    state.clear_chat(&session, &session_id);
    Json(serde_json::json!({
        "message": format!("Chat history cleared for session {}", session_id),
    }))
}

/// DELETE /api/chat/history/clear_all
pub async fn clear_all(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Json<serde_json::Value> {
    let cleared = state.clear_all_chats(&session);
    Json(serde_json::json!({
        "message": "All chat history cleared",
        "sessions_cleared": cleared,
    }))
}
