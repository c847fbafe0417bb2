//! Indexer provider trait for building per-document retrieval indexes

use async_trait::async_trait;

use crate::error::IndexError;

/// A retrievable unit of text
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    /// Position of the chunk within its document
    pub chunk_index: usize,
    pub text: String,
    /// Relevance to the query (higher is better)
    pub score: f32,
}

/// Handle to a built index, owned by exactly one document
pub trait PassageIndex: Send + Sync {
    /// Up to `k` passages ranked by relevance to `query`, best first
    fn retrieve(&self, query: &str, k: usize) -> Vec<Passage>;

    /// Number of chunks held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output of a successful index build
pub struct BuiltIndex {
    pub index: Box<dyn PassageIndex>,
    pub chunk_count: usize,
}

impl std::fmt::Debug for BuiltIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltIndex")
            .field("chunks", &self.index.len())
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

/// Trait for building retrieval indexes from extracted text
///
/// Implementations:
/// - `ChunkIndexer`: sentence-aware chunking into an in-memory keyword index
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Chunk and index `text`
    async fn build(&self, text: &str) -> Result<BuiltIndex, IndexError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
