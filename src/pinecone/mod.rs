//! Pinecone vector index integration.
//!
//! A lightweight HTTP client split across focused submodules:
//!
//! - [`client`]: control-plane host resolution plus data-plane upsert/query.
//! - [`types`]: request/response structs and error definitions.

/// HTTP client for Pinecone operations.
pub mod client;
/// Shared types used by the Pinecone client.
pub mod types;

pub use client::PineconeService;
pub use types::{PineconeError, RetrievedMatch, VectorMetadata, VectorUpsert};
