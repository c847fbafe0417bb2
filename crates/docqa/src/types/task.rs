//! Task status types for tracked ingestion work

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Coarse task state, as reported to pollers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Processing,
    Completed,
    Error,
}

impl TaskState {
    /// `completed` and `error` accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary attached to a completed ingestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDetail {
    pub word_count: usize,
    pub page_count: u32,
    pub chunk_count: usize,
    pub extraction_method: String,
}

/// Full task status; each state carries exactly the fields it can have
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Queued { message: String },
    Processing { progress: u8, message: String },
    Completed { message: String, detail: TaskDetail },
    /// `progress` is the last value reached before the failure
    Error { progress: u8, message: String },
}

impl TaskStatus {
    pub fn state(&self) -> TaskState {
        match self {
            Self::Queued { .. } => TaskState::Queued,
            Self::Processing { .. } => TaskState::Processing,
            Self::Completed { .. } => TaskState::Completed,
            Self::Error { .. } => TaskState::Error,
        }
    }

    pub fn progress(&self) -> u8 {
        match self {
            Self::Queued { .. } => 0,
            Self::Processing { progress, .. } | Self::Error { progress, .. } => *progress,
            Self::Completed { .. } => 100,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Queued { message }
            | Self::Processing { message, .. }
            | Self::Completed { message, .. }
            | Self::Error { message, .. } => message,
        }
    }

    pub fn detail(&self) -> Option<&TaskDetail> {
        match self {
            Self::Completed { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

/// A requested status change, applied by the task tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    /// Move to (or stay in) `processing` at the given progress
    Progress { progress: u8, message: String },
    /// Move to `completed`; progress becomes 100
    Complete { message: String, detail: TaskDetail },
    /// Move to `error`, keeping the last progress
    Fail { message: String },
}

impl TaskUpdate {
    pub fn progress(progress: u8, message: impl Into<String>) -> Self {
        Self::Progress {
            progress,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
        }
    }
}

/// Authoritative record for one task
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: Uuid,
    pub filename: String,
    pub source_path: PathBuf,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(id: Uuid, filename: String, source_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename,
            source_path,
            status: TaskStatus::Queued {
                message: "Queued for processing".to_string(),
            },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> TaskView {
        TaskView {
            task_id: self.id,
            state: self.status.state(),
            progress: self.status.progress(),
            message: self.status.message().to_string(),
            detail: self.status.detail().cloned(),
            filename: self.filename.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Snapshot handed to pollers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskView {
    pub task_id: Uuid,
    #[serde(rename = "status")]
    pub state: TaskState,
    pub progress: u8,
    pub message: String,
    #[serde(rename = "details")]
    pub detail: Option<TaskDetail>,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
