//! Ingestion pipeline: extract, index, register, one tracked task at a time

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::hash_content;
use crate::providers::{Extractor, Indexer};
use crate::storage::DocumentRegistry;
use crate::types::{DocumentRecord, ExtractionStats, TaskDetail, TaskUpdate};

use super::TaskTracker;

/// One unit of ingestion work; the task must already exist in the tracker
#[derive(Debug, Clone)]
pub struct IngestionJob {
    pub task_id: Uuid,
    pub source_path: PathBuf,
    pub filename: String,
}

/// Calls `Extractor::release` when dropped, including while unwinding
struct ReleaseGuard<'a> {
    extractor: &'a dyn Extractor,
    path: &'a Path,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.extractor.release(self.path);
    }
}

/// Drives one task from `queued` to a terminal state.
///
/// Used unchanged for user uploads and demo documents.
#[derive(Clone)]
pub struct IngestionPipeline {
    tracker: TaskTracker,
    registry: DocumentRegistry,
    extractor: Arc<dyn Extractor>,
    indexer: Arc<dyn Indexer>,
}

impl IngestionPipeline {
    pub fn new(
        tracker: TaskTracker,
        registry: DocumentRegistry,
        extractor: Arc<dyn Extractor>,
        indexer: Arc<dyn Indexer>,
    ) -> Self {
        Self {
            tracker,
            registry,
            extractor,
            indexer,
        }
    }

    /// Run the job in the background
    pub fn spawn(&self, job: IngestionJob) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            // Failures are recorded on the task
            let _ = pipeline.run(job).await;
        })
    }

    /// Run the job to completion.
    ///
    /// The task is terminal when this returns, whatever happened inside,
    /// panics included.
    pub async fn run(&self, job: IngestionJob) -> Result<Arc<DocumentRecord>> {
        let task_id = job.task_id;
        tracing::info!("Processing document {} (task {})", job.filename, task_id);

        let outcome = {
            let _release = ReleaseGuard {
                extractor: self.extractor.as_ref(),
                path: &job.source_path,
            };
            AssertUnwindSafe(self.execute(&job)).catch_unwind().await
        };

        match outcome {
            Ok(Ok(document)) => {
                tracing::info!(
                    "Document {} processed: {} words, {} chunks",
                    job.filename,
                    document.stats.word_count,
                    document.chunk_count
                );
                Ok(document)
            }
            Ok(Err(e)) => {
                let message = match &e {
                    Error::Extraction(_) | Error::Index(_) => e.to_string(),
                    other => format!("Processing error: {}", other),
                };
                tracing::error!("Task {} failed: {}", task_id, message);
                self.fail(task_id, message);
                Err(e)
            }
            Err(panic) => {
                let message = format!("Processing error: {}", panic_message(&*panic));
                tracing::error!("Task {} panicked: {}", task_id, message);
                self.fail(task_id, message.clone());
                Err(Error::Internal(message))
            }
        }
    }

    async fn execute(&self, job: &IngestionJob) -> Result<Arc<DocumentRecord>> {
        let task_id = job.task_id;

        self.step(task_id, 10, "Initializing document processor...")?;
        self.step(task_id, 20, "Analyzing document structure...")?;

        let extraction = self.extractor.extract(&job.source_path).await?;
        tracing::debug!(
            "Extracted {} words from {} via {}",
            extraction.word_count,
            job.filename,
            extraction.extraction_method
        );

        self.step(task_id, 60, "Creating search index...")?;
        let built = self.indexer.build(&extraction.text).await?;

        self.step(task_id, 90, "Finalizing...")?;

        let size_bytes = match tokio::fs::metadata(&job.source_path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!("Could not stat {}: {}", job.source_path.display(), e);
                0
            }
        };

        let detail = TaskDetail {
            word_count: extraction.word_count,
            page_count: extraction.page_count,
            chunk_count: built.chunk_count,
            extraction_method: extraction.extraction_method.clone(),
        };

        let document = self.registry.register(DocumentRecord {
            id: task_id,
            filename: job.filename.clone(),
            size_bytes,
            content_hash: hash_content(&extraction.text),
            uploaded_at: chrono::Utc::now(),
            stats: ExtractionStats {
                word_count: extraction.word_count,
                page_count: extraction.page_count,
                extraction_method: extraction.extraction_method,
            },
            chunk_count: built.chunk_count,
            sequence: 0,
            index: built.index,
        })?;

        let completed = self.tracker.update(
            task_id,
            TaskUpdate::Complete {
                message: "Document processing completed successfully!".to_string(),
                detail,
            },
        );
        if let Err(e) = completed {
            // A document exists only for a completed task
            self.registry.remove(task_id);
            return Err(e);
        }

        Ok(document)
    }

    fn step(&self, task_id: Uuid, progress: u8, message: &str) -> Result<()> {
        tracing::debug!("Task {} at {}%: {}", task_id, progress, message);
        self.tracker
            .update(task_id, TaskUpdate::progress(progress, message))
            .map(|_| ())
    }

    fn fail(&self, task_id: Uuid, message: String) {
        if let Err(e) = self.tracker.update(task_id, TaskUpdate::fail(message)) {
            tracing::warn!("Could not mark task {} as failed: {}", task_id, e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}
