//! Core types for tasks, documents, queries, and chat history

pub mod chat;
pub mod document;
pub mod query;
pub mod task;

pub use chat::{ChatRole, ChatTurn, ConversationSummary};
pub use document::{DocumentRecord, DocumentSummary, ExtractionStats};
pub use query::{QueryAnswer, QueryRequest};
pub use task::{TaskDetail, TaskRecord, TaskState, TaskStatus, TaskUpdate, TaskView};
