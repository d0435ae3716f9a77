//! HTTP client wrapper for interacting with Pinecone.

use crate::pinecone::types::{
    DescribeIndexResponse, PineconeError, QueryResponseBody, RetrievedMatch, VectorUpsert,
};
use reqwest::Client;
use serde_json::json;
use tokio::sync::OnceCell;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// Lightweight HTTP client for Pinecone upsert and query operations.
///
/// The data-plane host is looked up once from the control plane and cached
/// for the lifetime of the service; a configured host override skips the
/// lookup entirely.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) index_name: String,
    pub(crate) control_plane_url: String,
    pub(crate) host: OnceCell<String>,
}

impl PineconeService {
    /// Construct a new client for the named index.
    pub fn new(
        client: Client,
        api_key: String,
        index_name: String,
        host_override: Option<String>,
    ) -> Self {
        tracing::debug!(
            index = %index_name,
            host_override = host_override.is_some(),
            "Initialized Pinecone HTTP client"
        );
        Self {
            client,
            api_key,
            index_name,
            control_plane_url: CONTROL_PLANE_URL.to_string(),
            host: OnceCell::new_with(host_override.map(ensure_scheme)),
        }
    }

    /// Resolve (and cache) the data-plane host for the configured index.
    async fn index_host(&self) -> Result<&String, PineconeError> {
        self.host
            .get_or_try_init(|| async {
                let url = format!(
                    "{base}/indexes/{index}",
                    base = self.control_plane_url.trim_end_matches('/'),
                    index = self.index_name
                );
                let response = self
                    .client
                    .get(url)
                    .header("Api-Key", &self.api_key)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = PineconeError::UnexpectedStatus { status, body };
                    tracing::error!(index = %self.index_name, error = %error, "Index host resolution failed");
                    return Err(error);
                }

                let described: DescribeIndexResponse = response.json().await?;
                tracing::debug!(index = %self.index_name, host = %described.host, "Resolved index host");
                Ok(ensure_scheme(described.host))
            })
            .await
    }

    /// Write vectors into `namespace`, fully replacing entries with matching ids.
    pub async fn upsert(
        &self,
        namespace: &str,
        vectors: Vec<VectorUpsert>,
    ) -> Result<(), PineconeError> {
        if vectors.is_empty() {
            return Ok(());
        }

        let host = self.index_host().await?;
        let count = vectors.len();
        let response = self
            .client
            .post(format!("{host}/vectors/upsert"))
            .header("Api-Key", &self.api_key)
            .json(&json!({ "vectors": vectors, "namespace": namespace }))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!(namespace, vectors = count, "Vectors upserted");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(namespace, error = %error, "Pinecone upsert failed");
            Err(error)
        }
    }

    /// Return the `top_k` nearest records to `vector` within `namespace`.
    pub async fn query(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<RetrievedMatch>, PineconeError> {
        let host = self.index_host().await?;
        let response = self
            .client
            .post(format!("{host}/query"))
            .header("Api-Key", &self.api_key)
            .json(&json!({
                "vector": vector,
                "topK": top_k,
                "namespace": namespace,
                "includeMetadata": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(namespace, error = %error, "Pinecone query failed");
            return Err(error);
        }

        let payload: QueryResponseBody = response.json().await?;
        Ok(payload
            .matches
            .into_iter()
            .map(|entry| entry.into_match(namespace))
            .collect())
    }
}

fn ensure_scheme(host: String) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host
    } else {
        format!("https://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use crate::pinecone::types::VectorMetadata;

    fn test_client() -> Client {
        Client::builder()
            .user_agent("aurora-rag-test")
            .build()
            .expect("client")
    }

    fn service_with_host(server: &MockServer) -> PineconeService {
        PineconeService {
            client: test_client(),
            api_key: "pc-key".into(),
            index_name: "kb-index".into(),
            control_plane_url: CONTROL_PLANE_URL.into(),
            host: OnceCell::new_with(Some(server.base_url())),
        }
    }

    #[tokio::test]
    async fn upsert_emits_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/vectors/upsert")
                    .header("api-key", "pc-key")
                    .body_contains("\"namespace\":\"col-7\"")
                    .body_contains("\"id\":\"doc-1-chunk-0\"");
                then.status(200)
                    .json_body(serde_json::json!({ "upsertedCount": 1 }));
            })
            .await;

        let vectors = vec![VectorUpsert {
            id: "doc-1-chunk-0".into(),
            values: vec![0.1, 0.2],
            metadata: VectorMetadata {
                collection_id: "col-7".into(),
                document_id: "doc-1".into(),
                chunk_id: "chunk-0".into(),
                text: "chunk body".into(),
            },
        }];

        service_with_host(&server)
            .upsert("col-7", vectors)
            .await
            .expect("upsert");
        mock.assert();
    }

    #[tokio::test]
    async fn empty_upsert_skips_the_request() {
        let server = MockServer::start_async().await;
        service_with_host(&server)
            .upsert("col-7", Vec::new())
            .await
            .expect("noop upsert");
    }

    #[tokio::test]
    async fn query_projects_matches_with_metadata_defaults() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query")
                    .body_contains("\"topK\":5")
                    .body_contains("\"includeMetadata\":true");
                then.status(200).json_body(serde_json::json!({
                    "matches": [
                        {
                            "id": "doc-1-chunk-0",
                            "score": 0.91,
                            "metadata": {
                                "collection_id": "col-7",
                                "document_id": "doc-1",
                                "chunk_id": "chunk-0",
                                "text": "first chunk"
                            }
                        },
                        { "id": "doc-2-chunk-3", "score": 0.42 }
                    ]
                }));
            })
            .await;

        let matches = service_with_host(&server)
            .query("col-7", vec![0.3, 0.4], 5)
            .await
            .expect("query");

        mock.assert();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].document_id, "doc-1");
        assert_eq!(matches[0].text, "first chunk");
        assert!((matches[0].score - 0.91).abs() < f32::EPSILON);
        // bare match falls back to the queried namespace
        assert_eq!(matches[1].collection_id, "col-7");
        assert!(matches[1].text.is_empty());
    }

    #[tokio::test]
    async fn host_is_resolved_from_the_control_plane_once() {
        let server = MockServer::start_async().await;
        let describe = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/indexes/kb-index")
                    .header("api-key", "pc-key");
                then.status(200).json_body(serde_json::json!({
                    "name": "kb-index",
                    "host": "kb-index-abc123.svc.pinecone.io"
                }));
            })
            .await;

        let service = PineconeService {
            client: test_client(),
            api_key: "pc-key".into(),
            index_name: "kb-index".into(),
            control_plane_url: server.base_url(),
            host: OnceCell::new(),
        };

        let host = service.index_host().await.expect("host");
        assert_eq!(host, "https://kb-index-abc123.svc.pinecone.io");
        let again = service.index_host().await.expect("cached host");
        assert_eq!(again, "https://kb-index-abc123.svc.pinecone.io");
        describe.assert_hits(1);
    }

    #[tokio::test]
    async fn unexpected_status_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query");
                then.status(404).body("namespace not found");
            })
            .await;

        let error = service_with_host(&server)
            .query("missing", vec![0.1], 5)
            .await
            .unwrap_err();
        match error {
            PineconeError::UnexpectedStatus { status, body } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(body.contains("namespace not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
