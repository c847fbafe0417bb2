//! Extractive answerer: answers with the passage sentences that best cover the question

use async_trait::async_trait;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::AnswerError;
use crate::providers::{Answerer, GeneratedAnswer, Passage};
use crate::retrieval::query_terms;

/// Confidence when the question has no content words to check coverage against
const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// Confidence derived from how many question terms the passages contain.
///
/// Maps coverage in `[0, 1]` onto `[0.2, 0.95]`.
pub fn coverage_confidence(question: &str, passages: &[Passage]) -> f32 {
    let terms = query_terms(question);
    if terms.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }

    let present: HashSet<String> = passages
        .iter()
        .flat_map(|p| query_terms(&p.text))
        .collect();
    let covered = terms.iter().filter(|t| present.contains(*t)).count();
    let coverage = covered as f32 / terms.len() as f32;

    (0.2 + 0.75 * coverage).clamp(0.0, 1.0)
}

/// Answerer that quotes the best-matching sentences
pub struct ExtractiveAnswerer {
    max_sentences: usize,
}

impl ExtractiveAnswerer {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }
}

impl Default for ExtractiveAnswerer {
    fn default() -> Self {
        Self::new(3)
    }
}

struct Candidate<'a> {
    passage: usize,
    position: usize,
    hits: usize,
    text: &'a str,
}

#[async_trait]
impl Answerer for ExtractiveAnswerer {
    async fn generate(
        &self,
        question: &str,
        passages: &[Passage],
    ) -> Result<GeneratedAnswer, AnswerError> {
        if passages.is_empty() {
            return Err(AnswerError::new("No passages to answer from"));
        }

        let terms: HashSet<String> = query_terms(question).into_iter().collect();

        let mut candidates: Vec<Candidate<'_>> = passages
            .iter()
            .enumerate()
            .flat_map(|(passage, p)| {
                p.text
                    .split_sentence_bounds()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .enumerate()
                    .map(move |(position, text)| (passage, position, text))
            })
            .map(|(passage, position, text)| {
                let words: HashSet<String> = query_terms(text).into_iter().collect();
                Candidate {
                    passage,
                    position,
                    hits: terms.intersection(&words).count(),
                    text,
                }
            })
            .collect();

        if candidates.is_empty() {
            return Err(AnswerError::new("Passages contain no text"));
        }

        let mut selected: Vec<Candidate<'_>> = if candidates.iter().any(|c| c.hits > 0) {
            candidates.retain(|c| c.hits > 0);
            candidates.sort_by(|a, b| {
                b.hits
                    .cmp(&a.hits)
                    .then(a.passage.cmp(&b.passage))
                    .then(a.position.cmp(&b.position))
            });
            candidates.truncate(self.max_sentences);
            candidates
        } else {
            // Nothing overlaps the question: lead with the top passage's opening
            candidates.truncate(1);
            candidates
        };

        // Present in reading order
        selected.sort_by(|a, b| a.passage.cmp(&b.passage).then(a.position.cmp(&b.position)));

        let sources: HashSet<usize> = selected.iter().map(|c| c.passage).collect();
        let used: Vec<Passage> = sources.iter().map(|i| passages[*i].clone()).collect();
        let answer_text = selected
            .iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join(" ");

        Ok(GeneratedAnswer {
            confidence: coverage_confidence(question, &used),
            answer_text,
            sources_used: sources.len(),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(chunk_index: usize, text: &str) -> Passage {
        Passage {
            chunk_index,
            text: text.to_string(),
            score: 1.0,
        }
    }

    #[tokio::test]
    async fn test_answers_with_matching_sentences() {
        let answerer = ExtractiveAnswerer::default();
        let passages = vec![
            passage(0, "The warranty lasts two years. Shipping is free."),
            passage(3, "Returns are accepted within thirty days of delivery."),
        ];

        let answer = answerer
            .generate("How long does the warranty last?", &passages)
            .await
            .unwrap();

        assert_eq!(answer.answer_text, "The warranty lasts two years.");
        assert_eq!(answer.sources_used, 1);
        assert!(answer.confidence > 0.5 && answer.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_sources_used_counts_contributing_passages() {
        let answerer = ExtractiveAnswerer::new(4);
        let passages = vec![
            passage(0, "Solar output peaks at noon."),
            passage(1, "Battery storage smooths solar output overnight."),
            passage(2, "Unrelated text about tax law."),
        ];

        let answer = answerer
            .generate("When does solar output peak?", &passages)
            .await
            .unwrap();

        assert_eq!(answer.sources_used, 2);
        assert!(answer.answer_text.starts_with("Solar output peaks at noon."));
    }

    #[tokio::test]
    async fn test_no_overlap_falls_back_to_first_sentence() {
        let answerer = ExtractiveAnswerer::default();
        let passages = vec![passage(0, "Alpha beta gamma. Delta epsilon.")];

        let answer = answerer.generate("zebra?", &passages).await.unwrap();
        assert_eq!(answer.answer_text, "Alpha beta gamma.");
        assert!(answer.confidence < 0.5);
    }

    #[tokio::test]
    async fn test_empty_passages_is_an_error() {
        let answerer = ExtractiveAnswerer::default();
        tokio_test::assert_err!(answerer.generate("anything", &[]).await);
    }

    #[test]
    fn test_coverage_confidence_bounds() {
        let passages = vec![passage(0, "cats and dogs")];
        assert!((coverage_confidence("cats dogs", &passages) - 0.95).abs() < 1e-6);
        assert!((coverage_confidence("birds", &passages) - 0.2).abs() < 1e-6);
        assert!((coverage_confidence("what is it", &passages) - NEUTRAL_CONFIDENCE).abs() < 1e-6);
    }
}
