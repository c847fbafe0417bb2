//! API routes for the document Q&A server

pub mod auth;
pub mod chat;
pub mod documents;
pub mod query;
pub mod system;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Headroom over the file limit for multipart framing
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Build all API routes
pub fn api_routes(max_upload_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        // Sessions
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/user/profile", get(auth::profile))
        // Documents - with larger body limit for file uploads
        .route(
            "/documents/upload",
            post(documents::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/documents/processing-status/:id",
            get(documents::processing_status),
        )
        .route("/documents/list", get(documents::list_documents))
        .route("/documents/:id/set_active", post(documents::set_active))
        .route("/documents/:id", delete(documents::delete_document))
        .route("/documents/demo_ingest/:key", post(documents::demo_ingest))
        // Chat
        .route("/chat/query", post(query::query))
        .route("/chat/sessions", get(chat::sessions))
        .route("/chat/history/clear_all", delete(chat::clear_all))
        .route(
            "/chat/history/:session_id",
            get(chat::history).delete(chat::clear_history),
        )
        // System
        .route("/system/status", get(system::status))
        .route("/health", get(system::health))
}
