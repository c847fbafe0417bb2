//! Prompt templates for grounded answer generation

use crate::providers::Passage;

/// Prompt builder for document questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build numbered context from retrieved passages
    pub fn build_context(passages: &[Passage]) -> String {
        let mut context = String::new();

        for (i, passage) in passages.iter().enumerate() {
            context.push_str(&format!(
                "[{}] (chunk {})\n{}\n\n---\n\n",
                i + 1,
                passage.chunk_index + 1,
                passage.text.trim()
            ));
        }

        context
    }

    /// Build the full prompt with strict grounding
    pub fn build_prompt(question: &str, passages: &[Passage]) -> String {
        format!(
            r#"You are a document-grounded assistant that ONLY uses information from the provided excerpts.

RULES:
1. Use only information EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context, respond with "This information is not available in the provided document."
3. Never use outside knowledge or guess
4. Cite the excerpts you rely on inline as [1], [2], ...

CONTEXT:
{context}
QUESTION: {question}

Answer using ONLY the context above:"#,
            context = Self::build_context(passages),
            question = question.trim()
        )
    }
}
