//! Task tracker: authoritative status for every ingestion task
//!
//! Records are created at submission, mutated only through [`TaskTracker::update`],
//! and never removed for the life of the process.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result, TaskError};
use crate::types::{TaskRecord, TaskState, TaskStatus, TaskUpdate, TaskView};

/// Task counts by state
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TaskCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

/// Concurrent task registry
#[derive(Clone, Default)]
pub struct TaskTracker {
    tasks: Arc<DashMap<Uuid, TaskRecord>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task in state `queued`
    pub fn create(&self, id: Uuid, filename: impl Into<String>, source_path: PathBuf) -> Result<TaskView> {
        match self.tasks.entry(id) {
            Entry::Occupied(_) => Err(TaskError::DuplicateTask(id).into()),
            Entry::Vacant(slot) => {
                let record = TaskRecord::new(id, filename.into(), source_path);
                let view = record.view();
                slot.insert(record);
                tracing::debug!("Task {} queued", id);
                Ok(view)
            }
        }
    }

    /// Apply a status change.
    ///
    /// Terminal records reject every update and progress never decreases.
    pub fn update(&self, id: Uuid, update: TaskUpdate) -> Result<TaskView> {
        let mut record = self
            .tasks
            .get_mut(&id)
            .ok_or(TaskError::UnknownTask(id))?;

        let state = record.status.state();
        if state.is_terminal() {
            return Err(TaskError::IllegalTransition { id, state }.into());
        }

        let current = record.status.progress();
        let next = match update {
            TaskUpdate::Progress { progress, message } => {
                let progress = progress.min(100);
                if progress < current {
                    return Err(TaskError::ProgressRegression {
                        id,
                        current,
                        requested: progress,
                    }
                    .into());
                }
                TaskStatus::Processing { progress, message }
            }
            TaskUpdate::Complete { message, detail } => TaskStatus::Completed { message, detail },
            TaskUpdate::Fail { message } => TaskStatus::Error {
                progress: current,
                message,
            },
        };

        record.status = next;
        record.updated_at = chrono::Utc::now();
        Ok(record.view())
    }

    /// Current status of a task
    pub fn get(&self, id: Uuid) -> Result<TaskView> {
        self.tasks
            .get(&id)
            .map(|r| r.view())
            .ok_or_else(|| Error::not_found(format!("Task {}", id)))
    }

    /// State of a task, if it exists
    pub fn state(&self, id: Uuid) -> Option<TaskState> {
        self.tasks.get(&id).map(|r| r.status.state())
    }

    /// All tasks, oldest first
    pub fn list(&self) -> Vec<TaskView> {
        let mut views: Vec<TaskView> = self.tasks.iter().map(|r| r.view()).collect();
        views.sort_by_key(|v| v.created_at);
        views
    }

    pub fn counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for record in self.tasks.iter() {
            match record.status.state() {
                TaskState::Queued => counts.queued += 1,
                TaskState::Processing => counts.processing += 1,
                TaskState::Completed => counts.completed += 1,
                TaskState::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
