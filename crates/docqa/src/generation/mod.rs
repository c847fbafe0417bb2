//! Answer generation: prompt building, Ollama client, extractive fallback

pub mod extractive;
pub mod ollama;
pub mod prompt;

pub use extractive::{coverage_confidence, ExtractiveAnswerer};
pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
