//! Service coordinating the ingestion state machine and the RAG query pipeline.

use crate::{
    config::{Config, get_config},
    embedding::{EmbeddingClient, OpenAiEmbeddingClient},
    extract::extract_text,
    generation::{ChatClient, GenerationStream},
    metrics::{IngestMetrics, MetricsSnapshot},
    pinecone::{PineconeService, VectorMetadata, VectorUpsert},
    processing::{
        chunking::chunk_text,
        registry::DocumentRegistry,
        types::{DocumentRecord, IngestSubmission, IngestionError, QueryError, ServiceInfo},
    },
};
use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Number of nearest matches retrieved per query.
const TOP_K: usize = 5;

/// Pause inserted before each synthetic fallback fragment.
const FALLBACK_DELAY: Duration = Duration::from_millis(120);

const USER_AGENT: &str = concat!("aurora-rag/", env!("CARGO_PKG_VERSION"));

/// Boxed stream of answer fragments delivered to the HTTP boundary.
///
/// Fragments carry no trailing newline; the transport appends one per
/// fragment. The stream is infallible by construction: every failure on the
/// retrieval-or-generation path is masked by the synthetic fallback.
pub type AnswerStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Coordinates the full ingestion pipeline and the streaming query pipeline.
///
/// The service owns long-lived handles to the embedding client, the chat
/// client, the Pinecone transport, the document registry, and the metrics
/// registry. Construct it once near process start and share it through an
/// `Arc`; it is `Clone` so the fire-and-forget ingestion task can carry its
/// own handle.
#[derive(Clone)]
pub struct RagService {
    registry: Arc<DocumentRegistry>,
    embedder: Option<Arc<dyn EmbeddingClient + Send + Sync>>,
    generator: Option<Arc<ChatClient>>,
    index: Option<Arc<PineconeService>>,
    metrics: Arc<IngestMetrics>,
    info: ServiceInfo,
}

/// Abstraction over the service used by the HTTP surface.
pub trait RagApi: Send + Sync {
    /// Register a document and schedule its background ingestion.
    fn queue_ingestion(&self, submission: IngestSubmission) -> DocumentRecord;

    /// Open the streaming answer pipeline for a prompt against a namespace.
    fn answer_stream(&self, prompt: String, namespace: String) -> AnswerStream;

    /// Look up the current record for a submitted document.
    fn document_status(&self, document_id: &str) -> Option<DocumentRecord>;

    /// Identity of the backing vector index and chat model.
    fn service_info(&self) -> ServiceInfo;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RagService {
    /// Build the service from the globally installed configuration.
    pub fn new() -> Self {
        Self::from_config(get_config())
    }

    /// Build the service from an explicit configuration.
    ///
    /// Missing provider credentials do not fail construction: the affected
    /// clients stay unset and the pipelines degrade at runtime (ingestion
    /// records an error, queries fall back).
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to construct HTTP client");

        let embedder = config.openai_api_key.as_ref().map(|key| {
            Arc::new(OpenAiEmbeddingClient::new(
                http.clone(),
                key.clone(),
                config.openai_embed_model.clone(),
            )) as Arc<dyn EmbeddingClient + Send + Sync>
        });
        let generator = config.openai_api_key.as_ref().map(|key| {
            Arc::new(ChatClient::new(
                http.clone(),
                key.clone(),
                config.openai_chat_model.clone(),
            ))
        });
        let index = config.pinecone_api_key.as_ref().map(|key| {
            Arc::new(PineconeService::new(
                http,
                key.clone(),
                config.pinecone_index_name.clone(),
                config.pinecone_index_host.clone(),
            ))
        });

        if embedder.is_none() || index.is_none() {
            tracing::warn!(
                "Provider credentials missing; ingestion will fail and queries will fall back"
            );
        }

        Self {
            registry: Arc::new(DocumentRegistry::new()),
            embedder,
            generator,
            index,
            metrics: Arc::new(IngestMetrics::new()),
            info: ServiceInfo {
                vector_index: config.pinecone_index_name.clone(),
                model: config.openai_chat_model.clone(),
            },
        }
    }

    /// Register a document and schedule its background ingestion.
    ///
    /// The record is inserted in the `processing` state before this returns,
    /// so the caller observes the transition even though the pipeline itself
    /// runs fire-and-forget after the response is sent.
    pub fn queue_ingestion(&self, submission: IngestSubmission) -> DocumentRecord {
        let record = self.registry.insert_processing(submission);
        tracing::info!(
            document_id = %record.document_id,
            collection = %record.collection_id,
            storage_uri = %record.storage_uri,
            "Queued ingest"
        );

        let service = self.clone();
        let document_id = record.document_id.clone();
        tokio::spawn(async move {
            service.process_ingestion(&document_id).await;
        });

        record
    }

    /// Run the ingestion pipeline for a registered document.
    ///
    /// Terminal transitions happen here: any pipeline error lands the record
    /// in `error` with the error's message as the note; success lands it in
    /// `ready` with a chunk-count note.
    async fn process_ingestion(&self, document_id: &str) {
        let Some(record) = self.registry.get(document_id) else {
            tracing::warn!(document_id, "Ingestion scheduled for unknown document");
            return;
        };

        match self.run_ingestion(&record).await {
            Ok(chunk_count) => {
                self.registry.mark_ready(
                    document_id,
                    format!("Upserted {chunk_count} chunks to Pinecone."),
                );
                self.metrics.record_document(chunk_count as u64);
                tracing::info!(document_id, chunks = chunk_count, "Completed ingest");
            }
            Err(error) => {
                self.registry.mark_error(document_id, error.to_string());
                tracing::error!(document_id, error = %error, "Ingestion failed");
            }
        }
    }

    /// Extract, chunk, embed, and upsert one document; returns the chunk count.
    async fn run_ingestion(&self, record: &DocumentRecord) -> Result<usize, IngestionError> {
        let text = extract_text(&record.storage_uri)?;
        let chunks = chunk_text(&text);
        if chunks.is_empty() {
            return Err(IngestionError::NoTextExtracted);
        }

        let (Some(embedder), Some(index)) = (self.embedder.as_ref(), self.index.as_ref()) else {
            return Err(IngestionError::MissingProviders);
        };

        let mut vectors = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let values = embedder.embed(chunk).await?;
            vectors.push(VectorUpsert {
                id: format!("{}-chunk-{i}", record.document_id),
                values,
                metadata: VectorMetadata {
                    collection_id: record.collection_id.clone(),
                    document_id: record.document_id.clone(),
                    chunk_id: format!("chunk-{i}"),
                    text: chunk.clone(),
                },
            });
        }

        index.upsert(&record.collection_id, vectors).await?;
        Ok(chunks.len())
    }

    /// Open the streaming answer pipeline for a prompt against a namespace.
    ///
    /// Failures anywhere on the retrieval-or-generation path are logged at
    /// `warn` and masked by the synthetic fallback, which replays the prompt
    /// fragment-by-fragment with a fixed pause before each piece.
    pub fn answer_stream(&self, prompt: String, namespace: String) -> AnswerStream {
        let service = self.clone();
        Box::pin(stream! {
            let mut failure: Option<QueryError> = None;
            match service.open_generation(&prompt, &namespace).await {
                Ok(mut deltas) => {
                    while let Some(delta) = deltas.next().await {
                        match delta {
                            Ok(piece) => yield piece,
                            Err(error) => {
                                failure = Some(error.into());
                                break;
                            }
                        }
                    }
                }
                Err(error) => failure = Some(error),
            }

            if let Some(error) = failure {
                tracing::warn!(error = %error, "RAG streaming failed, falling back");
                for piece in fallback_fragments(&prompt) {
                    tokio::time::sleep(FALLBACK_DELAY).await;
                    yield piece;
                }
            }
        })
    }

    /// Embed the prompt, retrieve context, and open the completion stream.
    async fn open_generation(
        &self,
        prompt: &str,
        namespace: &str,
    ) -> Result<GenerationStream, QueryError> {
        let (Some(embedder), Some(index), Some(generator)) = (
            self.embedder.as_ref(),
            self.index.as_ref(),
            self.generator.as_ref(),
        ) else {
            return Err(QueryError::MissingProviders);
        };

        let query_vector = embedder.embed(prompt).await?;
        let matches = index.query(namespace, query_vector, TOP_K).await?;
        tracing::debug!(namespace, matches = matches.len(), "Assembled retrieval context");

        let context = matches
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(generator.stream_answer(prompt.to_string(), context))
    }

    /// Look up the current record for a submitted document.
    pub fn document_status(&self, document_id: &str) -> Option<DocumentRecord> {
        self.registry.get(document_id)
    }

    /// Identity of the backing vector index and chat model.
    pub fn service_info(&self) -> ServiceInfo {
        self.info.clone()
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl RagApi for RagService {
    fn queue_ingestion(&self, submission: IngestSubmission) -> DocumentRecord {
        RagService::queue_ingestion(self, submission)
    }

    fn answer_stream(&self, prompt: String, namespace: String) -> AnswerStream {
        RagService::answer_stream(self, prompt, namespace)
    }

    fn document_status(&self, document_id: &str) -> Option<DocumentRecord> {
        RagService::document_status(self, document_id)
    }

    fn service_info(&self) -> ServiceInfo {
        RagService::service_info(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RagService::metrics_snapshot(self)
    }
}

/// The canned reply streamed when the real pipeline is unavailable.
fn fallback_fragments(prompt: &str) -> Vec<String> {
    vec![
        "Synthesizing an AuroraMind reply. ".to_string(),
        "This stubbed AI service will echo your prompt back. ".to_string(),
        format!("Prompt: \"{prompt}\". "),
        "Connect Pinecone and OpenAI to replace this path.".to_string(),
    ]
}
