//! Shared types used by the Pinecone client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with Pinecone.
#[derive(Debug, Error)]
pub enum PineconeError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Pinecone responded with an unexpected status code.
    #[error("Unexpected Pinecone response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Pinecone.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Metadata stored alongside each vector in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Collection the source document belongs to.
    #[serde(default)]
    pub collection_id: String,
    /// Identifier of the source document.
    #[serde(default)]
    pub document_id: String,
    /// Position marker of the chunk within the document (`chunk-{i}`).
    #[serde(default)]
    pub chunk_id: String,
    /// Raw chunk text, replayed as retrieval context.
    #[serde(default)]
    pub text: String,
}

/// One vector ready for upsert, including id, values, and metadata.
#[derive(Debug, Clone, Serialize)]
pub struct VectorUpsert {
    /// Deterministic identifier (`{document_id}-chunk-{i}`); upserting the
    /// same id fully replaces the existing entry.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Metadata persisted with the vector.
    pub metadata: VectorMetadata,
}

/// Scored match returned by a similarity query.
#[derive(Debug, Clone)]
pub struct RetrievedMatch {
    /// Collection recorded in the match metadata (falls back to the queried
    /// namespace when metadata is absent).
    pub collection_id: String,
    /// Source document of the matched chunk.
    pub document_id: String,
    /// Chunk position marker.
    pub chunk_id: String,
    /// Similarity score reported by the index.
    pub score: f32,
    /// Stored chunk text.
    pub text: String,
}

#[derive(Deserialize)]
pub(crate) struct DescribeIndexResponse {
    pub(crate) host: String,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponseBody {
    #[serde(default)]
    pub(crate) matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
pub(crate) struct QueryMatch {
    #[serde(default)]
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) metadata: Option<VectorMetadata>,
}

impl QueryMatch {
    /// Project a raw match into a [`RetrievedMatch`], defaulting missing
    /// metadata against the queried namespace.
    pub(crate) fn into_match(self, namespace: &str) -> RetrievedMatch {
        let metadata = self.metadata.unwrap_or_else(|| VectorMetadata {
            collection_id: namespace.to_string(),
            document_id: String::new(),
            chunk_id: String::new(),
            text: String::new(),
        });
        RetrievedMatch {
            collection_id: if metadata.collection_id.is_empty() {
                namespace.to_string()
            } else {
                metadata.collection_id
            },
            document_id: metadata.document_id,
            chunk_id: metadata.chunk_id,
            score: self.score,
            text: metadata.text,
        }
    }
}
