//! Document processing pipelines.
//!
//! Ingestion (extract → chunk → embed → upsert, tracked by the registry)
//! and the retrieval-augmented streaming query pipeline both live here,
//! coordinated by [`RagService`].

/// Recursive character chunking with sliding overlap.
pub mod chunking;
/// In-memory registry tracking ingestion job status.
pub mod registry;
mod service;
/// Core data types and error definitions.
pub mod types;

pub use registry::DocumentRegistry;
pub use service::{AnswerStream, RagApi, RagService};
pub use types::{
    DocumentRecord, DocumentStatus, IngestSubmission, IngestionError, QueryError, ServiceInfo,
};
