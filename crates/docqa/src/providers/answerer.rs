//! Answerer provider trait for grounded answer generation

use async_trait::async_trait;

use crate::error::AnswerError;

use super::indexer::Passage;

/// Answer produced from a question and its retrieved passages
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub answer_text: String,
    /// In `[0, 1]`
    pub confidence: f32,
    pub sources_used: usize,
}

/// Trait for answer generation
///
/// Implementations:
/// - `ExtractiveAnswerer`: picks supporting sentences, no model needed
/// - `OllamaAnswerer`: local Ollama server
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Answer `question` using only `passages`
    async fn generate(
        &self,
        question: &str,
        passages: &[Passage],
    ) -> Result<GeneratedAnswer, AnswerError>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> bool;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
