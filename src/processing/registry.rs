//! In-memory registry tracking ingestion job status.

use crate::processing::types::{DocumentRecord, DocumentStatus, IngestSubmission};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;

/// Process-wide map of document ingestion records.
///
/// Records live for the process lifetime and are never deleted. The lock only
/// protects map structure; the background ingestion task is the sole logical
/// mutator for any given `document_id`, so a duplicate submission of the same
/// id simply restarts the state machine and the last attempt to finish wins.
#[derive(Default)]
pub struct DocumentRegistry {
    records: RwLock<HashMap<String, DocumentRecord>>,
}

impl DocumentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a record, already advanced to `processing`.
    ///
    /// The queued→processing transition happens here, synchronously with
    /// request acceptance, before the background task is spawned.
    pub fn insert_processing(&self, submission: IngestSubmission) -> DocumentRecord {
        let record = DocumentRecord {
            document_id: submission.document_id,
            collection_id: submission.collection_id,
            storage_uri: submission.storage_uri,
            title: submission.title,
            status: DocumentStatus::Processing,
            note: None,
            created_at: current_timestamp_rfc3339(),
        };
        let mut guard = self.records.write().expect("registry lock poisoned");
        guard.insert(record.document_id.clone(), record.clone());
        record
    }

    /// Fetch a copy of the record for `document_id`.
    pub fn get(&self, document_id: &str) -> Option<DocumentRecord> {
        let guard = self.records.read().expect("registry lock poisoned");
        guard.get(document_id).cloned()
    }

    /// Flip the record into the terminal `ready` state.
    pub fn mark_ready(&self, document_id: &str, note: String) {
        self.transition(document_id, DocumentStatus::Ready, note);
    }

    /// Flip the record into the terminal `error` state.
    pub fn mark_error(&self, document_id: &str, note: String) {
        self.transition(document_id, DocumentStatus::Error, note);
    }

    fn transition(&self, document_id: &str, status: DocumentStatus, note: String) {
        let mut guard = self.records.write().expect("registry lock poisoned");
        match guard.get_mut(document_id) {
            Some(record) => {
                record.status = status;
                record.note = Some(note);
            }
            None => tracing::warn!(document_id, "Status transition for unknown document"),
        }
    }
}

/// Current timestamp formatted for record storage.
fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
