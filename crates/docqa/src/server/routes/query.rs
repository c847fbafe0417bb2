//! Question answering endpoint

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::server::auth::AuthSession;
use crate::server::state::AppState;
use crate::types::{QueryAnswer, QueryRequest};

/// Query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub answer: QueryAnswer,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/chat/query
pub async fn query(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let answer = state.query(&session, request).await?;
    Ok(Json(QueryResponse {
        answer,
        timestamp: Utc::now(),
    }))
}
