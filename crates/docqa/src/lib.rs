//! docqa: multi-tenant document Q&A service
//!
//! Users log in, upload documents that are ingested in the background under a
//! tracked task, and ask questions answered from the retrieved passages of one
//! document. Each user's chat history is kept per conversation.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use server::{state::AppState, DocQaServer};
pub use types::{QueryAnswer, QueryRequest, TaskState, TaskView};
