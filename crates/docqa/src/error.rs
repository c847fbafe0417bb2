//! Error types for the document Q&A service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::types::TaskState;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Credential or session failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Request rejected before any background work started
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Task tracker contract violation
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Query could not be served
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Unknown task, document, or demo key
    #[error("{0} not found")]
    NotFound(String),

    /// Text extraction failed
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Index construction failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Answer generation failed
    #[error(transparent)]
    Answer(#[from] AnswerError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Authentication failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Admin access required")]
    Forbidden,
}

/// Synchronous upload validation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file selected")]
    MissingFile,

    #[error("File too large ({size} bytes, max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// Request body cut off by the upload limit before its size was known
    #[error("File too large (max {max} bytes)")]
    BodyTooLarge { max: u64 },

    #[error("Unsupported file format: {0}")]
    UnsupportedExtension(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// Task tracker failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task {0} already exists")]
    DuplicateTask(Uuid),

    #[error("Unknown task {0}")]
    UnknownTask(Uuid),

    #[error("Task {id} is already {state} and cannot change")]
    IllegalTransition { id: Uuid, state: TaskState },

    #[error("Task {id} progress cannot move from {current} to {requested}")]
    ProgressRegression { id: Uuid, current: u8, requested: u8 },
}

/// Query failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No documents uploaded. Please upload a document first.")]
    NoDocuments,

    #[error("Document {0} is still being processed")]
    DocumentNotReady(Uuid),
}

/// Failure reported by a text extractor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Extraction failed: {message}")]
pub struct ExtractionError {
    pub message: String,
}

impl ExtractionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by an indexer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Index creation failed: {message}")]
pub struct IndexError {
    pub message: String,
}

impl IndexError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by an answerer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Answer generation failed: {message}")]
pub struct AnswerError {
    pub message: String,
}

impl AnswerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Error {
    /// Create a not-found error for a named entity
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable kind, used in the error payload
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Auth(AuthError::Forbidden) => "forbidden",
            Error::Auth(_) => "auth_error",
            Error::Validation(
                ValidationError::FileTooLarge { .. } | ValidationError::BodyTooLarge { .. },
            ) => "file_too_large",
            Error::Validation(_) => "validation_error",
            Error::Task(_) => "task_error",
            Error::Query(QueryError::NoDocuments) => "no_documents",
            Error::Query(QueryError::DocumentNotReady(_)) => "document_not_ready",
            Error::NotFound(_) => "not_found",
            Error::Extraction(_) => "extraction_error",
            Error::Index(_) => "index_error",
            Error::Answer(_) => "answer_error",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Validation(
                ValidationError::FileTooLarge { .. } | ValidationError::BodyTooLarge { .. },
            ) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Task(TaskError::UnknownTask(_)) => StatusCode::NOT_FOUND,
            Error::Task(_) => StatusCode::CONFLICT,
            Error::Query(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Extraction(_) | Error::Index(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Answer(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
