//! Provider abstractions for the external collaborators
//!
//! The core only talks to text extraction, index building, and answer generation
//! through these traits, so each can be swapped (or mocked) independently.

pub mod answerer;
pub mod extractor;
pub mod indexer;
pub mod ollama;

use std::sync::Arc;
use std::time::Duration;

pub use answerer::{Answerer, GeneratedAnswer};
pub use extractor::{Extraction, Extractor};
pub use indexer::{BuiltIndex, Indexer, Passage, PassageIndex};
pub use ollama::OllamaAnswerer;

use crate::config::{AnswererBackend, AppConfig};
use crate::error::Result;
use crate::generation::ExtractiveAnswerer;
use crate::ingestion::LocalExtractor;
use crate::retrieval::ChunkIndexer;

/// The collaborator set wired into the service
#[derive(Clone)]
pub struct Providers {
    pub extractor: Arc<dyn Extractor>,
    pub indexer: Arc<dyn Indexer>,
    pub answerer: Arc<dyn Answerer>,
}

impl Providers {
    /// Build the default collaborators from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let answerer: Arc<dyn Answerer> = match config.llm.backend {
            AnswererBackend::Extractive => {
                tracing::info!("Using extractive answerer");
                Arc::new(ExtractiveAnswerer::default())
            }
            AnswererBackend::Ollama => {
                tracing::info!(
                    "Using Ollama answerer ({} at {})",
                    config.llm.generate_model,
                    config.llm.base_url
                );
                Arc::new(OllamaAnswerer::new(&config.llm)?)
            }
        };

        Ok(Self {
            extractor: Arc::new(LocalExtractor::with_timeout(Duration::from_secs(
                config.ingestion.extract_timeout_secs,
            ))),
            indexer: Arc::new(ChunkIndexer::new(
                config.ingestion.chunk_size,
                config.ingestion.chunk_overlap,
                config.ingestion.min_chunk_size,
            )),
            answerer,
        })
    }
}
