//! Ollama-based answerer
//!
//! Wraps the OllamaClient to implement the answerer trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{AnswerError, Result};
use crate::generation::{coverage_confidence, OllamaClient};

use super::answerer::{Answerer, GeneratedAnswer};
use super::indexer::Passage;

/// Reply the grounding prompt asks the model to give when the context is silent
const NOT_AVAILABLE: &str = "not available in the provided document";

/// Ollama answerer for grounded generation
pub struct OllamaAnswerer {
    client: Arc<OllamaClient>,
    /// `ollama:<model>`, reported in system status
    name: String,
}

impl OllamaAnswerer {
    /// Create a new Ollama answerer
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: Arc::new(OllamaClient::new(config)?),
            name: format!("ollama:{}", config.generate_model),
        })
    }
}

#[async_trait]
impl Answerer for OllamaAnswerer {
    async fn generate(
        &self,
        question: &str,
        passages: &[Passage],
    ) -> std::result::Result<GeneratedAnswer, AnswerError> {
        let answer_text = self
            .client
            .generate_answer(question, passages)
            .await
            .map_err(|e| AnswerError::new(e.to_string()))?;

        if answer_text.to_lowercase().contains(NOT_AVAILABLE) {
            return Ok(GeneratedAnswer {
                answer_text,
                confidence: 0.2,
                sources_used: 0,
            });
        }

        let sources_used = cited_sources(&answer_text, passages.len());
        Ok(GeneratedAnswer {
            confidence: coverage_confidence(question, passages),
            answer_text,
            sources_used,
        })
    }

    async fn health_check(&self) -> bool {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Count distinct `[n]` markers that point at a real passage; uncited answers count all passages
fn cited_sources(answer: &str, passage_count: usize) -> usize {
    let mut seen = vec![false; passage_count];
    for (i, _) in answer.match_indices('[') {
        let rest = &answer[i + 1..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() || !rest[digits.len()..].starts_with(']') {
            continue;
        }
        if let Ok(n) = digits.parse::<usize>() {
            if n >= 1 && n <= passage_count {
                seen[n - 1] = true;
            }
        }
    }

    match seen.iter().filter(|s| **s).count() {
        0 => passage_count,
        n => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cited_sources_counts_distinct_valid_markers() {
        assert_eq!(cited_sources("Rates rose [1] and fell [3]. See [1].", 4), 2);
        assert_eq!(cited_sources("Out of range [9].", 4), 4);
        assert_eq!(cited_sources("No markers at all.", 3), 3);
        assert_eq!(cited_sources("Array[i] is not a citation [2]", 2), 1);
    }

    #[test]
    fn test_name_carries_the_model() {
        let config = LlmConfig {
            generate_model: "mistral".to_string(),
            ..LlmConfig::default()
        };
        let answerer = OllamaAnswerer::new(&config).unwrap();
        assert_eq!(answerer.name(), "ollama:mistral");
    }
}
