//! Extractor provider trait for turning uploaded files into text

use async_trait::async_trait;
use std::path::Path;

use crate::error::ExtractionError;

/// Text and statistics pulled out of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub word_count: usize,
    pub page_count: u32,
    pub extraction_method: String,
}

/// Trait for document text extraction
///
/// Implementations:
/// - `LocalExtractor`: pdf-extract / lopdf / docx-rs / plain text
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract text from the file at `path`
    async fn extract(&self, path: &Path) -> Result<Extraction, ExtractionError>;

    /// Release any temporary resources held for `path`.
    ///
    /// Called exactly once per ingestion run, whatever its outcome.
    fn release(&self, _path: &Path) {}

    /// Get provider name for logging
    fn name(&self) -> &str;
}
