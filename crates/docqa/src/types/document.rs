//! Ingested document types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::providers::PassageIndex;

/// Statistics reported by the extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionStats {
    pub word_count: usize,
    pub page_count: u32,
    pub extraction_method: String,
}

/// A queryable document, produced by exactly one completed ingestion task.
///
/// The id is the id of the originating task. The retrieval index is owned by the
/// record for its whole lifetime.
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    pub size_bytes: u64,
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
    pub stats: ExtractionStats,
    pub chunk_count: usize,
    /// Registration order; assigned by the registry
    pub sequence: u64,
    pub index: Box<dyn PassageIndex>,
}

impl DocumentRecord {
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            task_id: self.id,
            filename: self.filename.clone(),
            size: self.size_bytes,
            upload_time: self.uploaded_at,
            processing_status: "completed".to_string(),
            word_count: self.stats.word_count,
            page_count: self.stats.page_count,
            extraction_method: self.stats.extraction_method.clone(),
            chunk_count: self.chunk_count,
        }
    }
}

impl fmt::Debug for DocumentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRecord")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("size_bytes", &self.size_bytes)
            .field("chunk_count", &self.chunk_count)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Listing entry for a registered document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub task_id: Uuid,
    pub filename: String,
    pub size: u64,
    pub upload_time: DateTime<Utc>,
    pub processing_status: String,
    pub word_count: usize,
    pub page_count: u32,
    pub extraction_method: String,
    pub chunk_count: usize,
}
