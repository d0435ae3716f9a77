use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_ingested: AtomicU64,
    chunks_ingested: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed ingestion and the number of chunks it produced.
    pub fn record_document(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_ingested
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_ingested: self.chunks_ingested.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested to completion since startup.
    pub documents_ingested: u64,
    /// Total chunk count upserted across all completed ingestions.
    pub chunks_ingested: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = IngestMetrics::new();
        metrics.record_document(2);
        metrics.record_document(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.chunks_ingested, 5);
    }

    #[test]
    fn snapshot_is_consistent() {
        let metrics = IngestMetrics::new();
        assert_eq!(metrics.snapshot().documents_ingested, 0);
        assert_eq!(metrics.snapshot().chunks_ingested, 0);
    }
}
