//! Query request and answer types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Question posed against an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question
    pub query: String,
    /// Conversation the exchange is recorded under
    #[serde(default)]
    pub session_id: String,
    /// Document to ask; falls back to the active, then first-registered document
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

/// Result of one query transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub confidence: f32,
    /// Passages the answerer actually relied on
    pub sources_used: usize,
    /// Passages retrieved from the index (may exceed `sources_used`)
    pub chunks_retrieved: usize,
    pub document_id: Uuid,
}
