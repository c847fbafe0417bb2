//! Document ingestion: text extraction and chunking

pub mod chunker;
pub mod parser;

pub use chunker::{TextChunk, TextChunker};
pub use parser::{hash_content, LocalExtractor};
