//! Passage retrieval and the query transaction

pub mod engine;
pub mod search;

pub use engine::QueryEngine;
pub use search::{query_terms, ChunkIndexer, KeywordIndex};
