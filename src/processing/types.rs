//! Core data types and error definitions for the ingestion and query pipelines.

use crate::{
    embedding::EmbeddingError, extract::ExtractError, generation::GenerationError,
    pinecone::PineconeError,
};
use serde::Serialize;
use thiserror::Error;

/// Lifecycle state of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Accepted but not yet picked up by the background task.
    Queued,
    /// The background task is running the pipeline.
    Processing,
    /// Every chunk was embedded and upserted into the vector index.
    Ready,
    /// The pipeline failed; `note` carries the diagnostic.
    Error,
}

impl DocumentStatus {
    /// Whether the state machine has finished with this document.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

/// Tracked state of one submitted document.
///
/// Created when an ingest request is accepted and mutated in place by the
/// background task; records are never deleted and do not survive a restart.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    /// Caller-supplied unique identifier for the document.
    pub document_id: String,
    /// Collection the document belongs to; doubles as the vector namespace.
    pub collection_id: String,
    /// Filesystem path the extractor reads from.
    pub storage_uri: String,
    /// Human-readable title (defaults to `"Untitled"`).
    pub title: String,
    /// Current position in the ingestion state machine.
    pub status: DocumentStatus,
    /// Diagnostic string set on reaching a terminal state.
    pub note: Option<String>,
    /// RFC3339 timestamp of request acceptance.
    pub created_at: String,
}

/// Validated ingest request handed from the HTTP boundary to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSubmission {
    /// Caller-supplied unique identifier for the document.
    pub document_id: String,
    /// Target collection / vector namespace.
    pub collection_id: String,
    /// Filesystem path to extract text from.
    pub storage_uri: String,
    /// Document title, already defaulted by the boundary.
    pub title: String,
}

/// Identity of the backing vector index and chat model, reported by `/health`.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Name of the Pinecone index in use.
    pub vector_index: String,
    /// Chat model used for answer generation.
    pub model: String,
}

/// Errors emitted by the background ingestion pipeline.
///
/// Each variant's `Display` text becomes the record's `note` when the state
/// machine lands in `error`.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Text extraction failed before chunking.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Chunking produced nothing to index.
    #[error("no text extracted")]
    NoTextExtracted,
    /// Embedding or vector-index credentials are not configured.
    #[error("missing OPENAI_API_KEY or PINECONE_API_KEY for ingestion")]
    MissingProviders,
    /// Embedding provider failed to produce a vector for a chunk.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Pinecone rejected the upsert.
    #[error("Pinecone request failed: {0}")]
    VectorStore(#[from] PineconeError),
}

/// Errors on the retrieval-or-generation path.
///
/// These never reach the caller; the answer stream masks them with the
/// synthetic fallback and logs at `warn`.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Clients required for retrieval are not configured.
    #[error("vector or embedding client missing")]
    MissingProviders,
    /// Embedding provider failed on the query text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Pinecone similarity search failed.
    #[error("Pinecone request failed: {0}")]
    VectorStore(#[from] PineconeError),
    /// The streaming chat completion failed before or during generation.
    #[error("Answer generation failed: {0}")]
    Generation(#[from] GenerationError),
}
