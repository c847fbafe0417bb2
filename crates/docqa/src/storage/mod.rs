//! In-memory storage for ingested documents

pub mod documents;

pub use documents::DocumentRegistry;
