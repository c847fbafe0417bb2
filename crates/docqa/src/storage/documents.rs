//! Document registry: completed, queryable documents keyed by task id

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{DocumentRecord, DocumentSummary};

/// Concurrent registry of ingested documents.
///
/// Records are immutable once registered and shared as `Arc`s, so a query keeps
/// its document alive even if it is removed mid-flight.
#[derive(Clone, Default)]
pub struct DocumentRegistry {
    documents: Arc<DashMap<Uuid, Arc<DocumentRecord>>>,
    sequence: Arc<AtomicU64>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, stamping its registration sequence
    pub fn register(&self, mut record: DocumentRecord) -> Result<Arc<DocumentRecord>> {
        let slot = match self.documents.entry(record.id) {
            Entry::Occupied(_) => {
                return Err(Error::internal(format!(
                    "Document {} is already registered",
                    record.id
                )))
            }
            Entry::Vacant(slot) => slot,
        };

        record.sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let record = Arc::new(record);
        slot.insert(Arc::clone(&record));

        tracing::info!(
            "Registered document {} ({}, {} chunks)",
            record.id,
            record.filename,
            record.chunk_count
        );
        Ok(record)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<DocumentRecord>> {
        self.documents.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.documents.contains_key(&id)
    }

    /// The earliest-registered document still present
    pub fn first(&self) -> Option<Arc<DocumentRecord>> {
        self.documents
            .iter()
            .min_by_key(|r| r.sequence)
            .map(|r| Arc::clone(r.value()))
    }

    /// Summaries in registration order
    pub fn list(&self) -> Vec<DocumentSummary> {
        let mut records: Vec<Arc<DocumentRecord>> =
            self.documents.iter().map(|r| Arc::clone(r.value())).collect();
        records.sort_by_key(|r| r.sequence);
        records.iter().map(|r| r.summary()).collect()
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<DocumentRecord>> {
        self.documents.remove(&id).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
