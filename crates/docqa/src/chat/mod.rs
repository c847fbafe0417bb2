//! Conversation history

pub mod history;

pub use history::ChatHistoryStore;
