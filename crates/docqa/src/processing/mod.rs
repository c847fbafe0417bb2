//! Background ingestion with tracked task status

pub mod demo;
pub mod pipeline;
pub mod task_tracker;

pub use demo::{DemoIngestor, DemoStatus};
pub use pipeline::{IngestionJob, IngestionPipeline};
pub use task_tracker::{TaskCounts, TaskTracker};
