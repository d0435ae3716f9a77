#![deny(missing_docs)]

//! Core library for the AuroraMind RAG service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Document text extraction.
pub mod extract;
/// Streaming answer generation.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Pinecone vector index integration.
pub mod pinecone;
/// Ingestion and query pipelines.
pub mod processing;
