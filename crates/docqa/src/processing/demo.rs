//! Pre-seeded demo documents, ingested through the regular pipeline

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{TaskState, TaskView};

use super::{IngestionJob, IngestionPipeline, TaskTracker};

/// Mirror of the task behind a demo key
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DemoStatus {
    pub key: String,
    pub task_id: Uuid,
    pub status: TaskState,
    pub progress: u8,
    pub message: String,
    pub filename: String,
}

/// Starts demo ingestions and keeps one status entry per demo key
#[derive(Clone)]
pub struct DemoIngestor {
    pipeline: IngestionPipeline,
    tracker: TaskTracker,
    files: Arc<BTreeMap<String, PathBuf>>,
    mirror: Arc<DashMap<String, DemoStatus>>,
}

impl DemoIngestor {
    pub fn new(
        pipeline: IngestionPipeline,
        tracker: TaskTracker,
        files: BTreeMap<String, PathBuf>,
    ) -> Self {
        Self {
            pipeline,
            tracker,
            files: Arc::new(files),
            mirror: Arc::new(DashMap::new()),
        }
    }

    /// Known demo keys
    pub fn keys(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Start ingesting the demo document for `key`.
    ///
    /// A run that is in flight or completed is returned as is; a run that
    /// ended in error is replaced by a fresh task.
    pub fn start(&self, key: &str) -> Result<DemoStatus> {
        let path = self
            .files
            .get(key)
            .ok_or_else(|| Error::not_found(format!("Demo document '{}'", key)))?;

        if !path.is_file() {
            tracing::warn!("Demo file for '{}' missing at {}", key, path.display());
            return Err(Error::not_found(format!("Demo file for '{}'", key)));
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.to_string());

        let job = match self.mirror.entry(key.to_string()) {
            Entry::Occupied(existing) if existing.get().status != TaskState::Error => {
                tracing::debug!("Demo '{}' already started as {}", key, existing.get().task_id);
                return Ok(existing.get().clone());
            }
            entry => {
                let task_id = Uuid::new_v4();
                let view = self.tracker.create(task_id, filename.clone(), path.clone())?;
                let status = DemoStatus {
                    key: key.to_string(),
                    task_id,
                    status: view.state,
                    progress: view.progress,
                    message: "Processing demo document...".to_string(),
                    filename: filename.clone(),
                };
                entry.insert(status);
                IngestionJob {
                    task_id,
                    source_path: path.clone(),
                    filename,
                }
            }
        };

        tracing::info!("Starting demo ingestion '{}' as task {}", key, job.task_id);
        let started = self.status(key)?;

        let pipeline = self.pipeline.clone();
        let ingestor = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let task_id = job.task_id;
            let _ = pipeline.run(job).await;
            ingestor.mirror_result(&key, task_id);
        });

        Ok(started)
    }

    /// Current mirror entry for `key`
    pub fn status(&self, key: &str) -> Result<DemoStatus> {
        let entry = self
            .mirror
            .get(key)
            .ok_or_else(|| Error::not_found(format!("Demo document '{}'", key)))?;

        let mut status = entry.clone();
        drop(entry);

        // The tracker runs ahead of the mirror until `mirror_result` catches up
        if !status.status.is_terminal() {
            if let Ok(view) = self.tracker.get(status.task_id) {
                follow(&mut status, view);
            }
        }
        Ok(status)
    }

    fn mirror_result(&self, key: &str, task_id: Uuid) {
        let view = match self.tracker.get(task_id) {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!("Demo '{}' lost its task {}: {}", key, task_id, e);
                return;
            }
        };

        let state = view.state;
        if let Some(mut entry) = self.mirror.get_mut(key) {
            if entry.task_id == task_id {
                follow(&mut entry, view);
            }
        }
        tracing::info!("Demo '{}' finished as {}", key, state);
    }
}

/// Copy live progress; state and message only once the task is terminal
fn follow(status: &mut DemoStatus, view: TaskView) {
    status.progress = view.progress;
    if view.state.is_terminal() {
        status.status = view.state;
        status.message = view.message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::pipeline::tests::{Behavior, MockExtractor};
    use crate::processing::tests::wait_for_terminal;
    use crate::retrieval::ChunkIndexer;
    use crate::storage::DocumentRegistry;
    use crate::types::TaskUpdate;
    use std::sync::atomic::Ordering;

    struct Fixture {
        demo: DemoIngestor,
        tracker: TaskTracker,
        registry: DocumentRegistry,
        extractor: Arc<MockExtractor>,
        _dir: tempfile::TempDir,
    }

    fn fixture(behavior: Behavior) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampledata.pdf");
        std::fs::write(&path, b"%PDF-1.4 stand-in").unwrap();

        let mut files = BTreeMap::new();
        files.insert("demo_data".to_string(), path);
        files.insert("demo_missing".to_string(), dir.path().join("absent.pdf"));

        let tracker = TaskTracker::new();
        let registry = DocumentRegistry::new();
        let extractor = Arc::new(MockExtractor::new(behavior));
        let pipeline = IngestionPipeline::new(
            tracker.clone(),
            registry.clone(),
            extractor.clone(),
            Arc::new(ChunkIndexer::new(200, 20, 5)),
        );

        Fixture {
            demo: DemoIngestor::new(pipeline, tracker.clone(), files),
            tracker,
            registry,
            extractor,
            _dir: dir,
        }
    }

    async fn wait_for_mirror(demo: &DemoIngestor, key: &str) -> DemoStatus {
        for _ in 0..400 {
            let status = demo.status(key).unwrap();
            if status.status.is_terminal() {
                return status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("demo '{}' never finished", key);
    }

    #[tokio::test]
    async fn test_demo_twice_reuses_task() {
        let f = fixture(Behavior::Succeed);

        let first = f.demo.start("demo_data").unwrap();
        let second = f.demo.start("demo_data").unwrap();
        assert_eq!(first.task_id, second.task_id);

        let view = wait_for_terminal(&f.tracker, first.task_id).await;
        assert_eq!(view.state, TaskState::Completed);

        let mirrored = wait_for_mirror(&f.demo, "demo_data").await;
        assert_eq!(mirrored.status, TaskState::Completed);
        assert_eq!(mirrored.progress, 100);

        let third = f.demo.start("demo_data").unwrap();
        assert_eq!(third.task_id, first.task_id);
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.tracker.len(), 1);
        assert_eq!(f.extractor.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_demo_reruns_with_new_task() {
        let f = fixture(Behavior::Fail);

        let first = f.demo.start("demo_data").unwrap();
        let mirrored = wait_for_mirror(&f.demo, "demo_data").await;
        assert_eq!(mirrored.status, TaskState::Error);
        assert_eq!(mirrored.message, "Extraction failed: corrupt file");

        let retry = f.demo.start("demo_data").unwrap();
        assert_ne!(retry.task_id, first.task_id);
        assert_eq!(f.tracker.get(first.task_id).unwrap().state, TaskState::Error);
    }

    #[test]
    fn test_status_reports_terminal_task_before_mirror_catches_up() {
        let f = fixture(Behavior::Succeed);
        let task_id = Uuid::new_v4();
        f.tracker
            .create(task_id, "sampledata.pdf", PathBuf::from("sampledata.pdf"))
            .unwrap();
        f.tracker
            .update(task_id, TaskUpdate::progress(20, "Analyzing document structure..."))
            .unwrap();
        f.demo.mirror.insert(
            "demo_data".to_string(),
            DemoStatus {
                key: "demo_data".to_string(),
                task_id,
                status: TaskState::Processing,
                progress: 20,
                message: "Processing demo document...".to_string(),
                filename: "sampledata.pdf".to_string(),
            },
        );

        let running = f.demo.status("demo_data").unwrap();
        assert_eq!(running.status, TaskState::Processing);
        assert_eq!(running.message, "Processing demo document...");

        f.tracker
            .update(task_id, TaskUpdate::fail("Extraction failed: corrupt file"))
            .unwrap();

        let status = f.demo.status("demo_data").unwrap();
        assert_eq!(status.status, TaskState::Error);
        assert_eq!(status.progress, 20);
        assert_eq!(status.message, "Extraction failed: corrupt file");
    }

    #[tokio::test]
    async fn test_unknown_key_and_missing_file() {
        let f = fixture(Behavior::Succeed);
        assert!(matches!(f.demo.start("nope"), Err(Error::NotFound(_))));
        assert!(matches!(f.demo.start("demo_missing"), Err(Error::NotFound(_))));
        assert!(matches!(f.demo.status("demo_data"), Err(Error::NotFound(_))));
        assert!(f.tracker.is_empty());
    }
}
