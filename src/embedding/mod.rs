use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Default OpenAI API base used outside of tests.
pub(crate) const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// HTTP layer failed before receiving a response.
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider responded with an unexpected status code.
    #[error("unexpected embeddings response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The provider returned a well-formed response with no vector in it.
    #[error("embedding provider returned no vector")]
    EmptyResponse,
}

/// Interface implemented by embedding backends.
///
/// One text in, one vector out. The pipeline deliberately performs no
/// batching, retries, or caching; every chunk and every query is an
/// independent call.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for the supplied text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// OpenAI embeddings API adapter.
pub struct OpenAiEmbeddingClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
}

impl OpenAiEmbeddingClient {
    /// Construct a client against the public OpenAI API.
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url: OPENAI_API_BASE.to_string(),
            api_key,
            model,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tracing::debug!(model = %self.model, chars = text.len(), "Generating embedding");
        let response = self
            .client
            .post(format!(
                "{base}/embeddings",
                base = self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = EmbeddingError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Embedding request failed");
            return Err(error);
        }

        let payload: EmbeddingsResponse = response.json().await?;
        payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(EmbeddingError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> OpenAiEmbeddingClient {
        OpenAiEmbeddingClient {
            client: Client::builder()
                .user_agent("aurora-rag-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: "sk-test".into(),
            model: "text-embedding-3-small".into(),
        }
    }

    #[tokio::test]
    async fn embed_emits_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(
                        r#"{ "model": "text-embedding-3-small", "input": "hello" }"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "data": [ { "embedding": [0.25, -0.5, 0.75] } ]
                }));
            })
            .await;

        let vector = client_for(&server).embed("hello").await.expect("embedding");

        mock.assert();
        assert_eq!(vector, vec![0.25, -0.5, 0.75]);
    }

    #[tokio::test]
    async fn provider_error_surfaces_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(401).body("invalid api key");
            })
            .await;

        let error = client_for(&server).embed("hello").await.unwrap_err();
        match error {
            EmbeddingError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_data_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200)
                    .json_body(serde_json::json!({ "data": [] }));
            })
            .await;

        let error = client_for(&server).embed("hello").await.unwrap_err();
        assert!(matches!(error, EmbeddingError::EmptyResponse));
    }
}
