//! HTTP surface for the AuroraMind RAG service.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /health` – Service identity: status, vector index name, chat model.
//! - `GET /metrics` – Ingestion counters for observability dashboards.
//! - `POST /internal/ingest` – Accept a document for background ingestion and
//!   return `202 {status: "accepted", document_id}` immediately.
//! - `POST /internal/rag/query/stream` – Stream a retrieval-augmented answer
//!   as newline-terminated plain-text fragments.
//! - `GET /internal/documents/{id}` – Poll the ingestion state machine.
//!
//! Every `/internal/*` route is gated on the `x-service-token` header when a
//! service token is configured; an empty token disables the gate.

use crate::processing::{DocumentRecord, IngestSubmission, RagApi};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

/// Namespace queried when a request does not name a knowledge base.
const DEFAULT_NAMESPACE: &str = "kb-default";

/// Build the HTTP router exposing the service API surface.
///
/// `service_token` gates the `/internal/*` routes; pass an empty string to
/// disable the gate (local development, tests).
pub fn create_router<S>(service: Arc<S>, service_token: String) -> Router
where
    S: RagApi + 'static,
{
    let token = ServiceToken(Arc::from(service_token));
    let internal = Router::new()
        .route("/ingest", post(ingest_document::<S>))
        .route("/rag/query/stream", post(stream_rag_answer::<S>))
        .route("/documents/:document_id", get(document_status::<S>))
        .route_layer(middleware::from_fn_with_state(
            token,
            require_service_token,
        ));

    Router::new()
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .nest("/internal", internal)
        .with_state(service)
}

#[derive(Clone)]
struct ServiceToken(Arc<str>);

/// Reject internal requests whose `x-service-token` header does not match the
/// configured secret. An empty secret disables the check.
async fn require_service_token(
    State(token): State<ServiceToken>,
    request: Request,
    next: Next,
) -> Response {
    if token.0.is_empty() {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get("x-service-token")
        .and_then(|value| value.to_str().ok());
    if presented == Some(token.0.as_ref()) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected internal request: bad service token");
        AppError::Unauthorized.into_response()
    }
}

/// Request body for `POST /internal/ingest`.
///
/// Fields are optional at the deserialization layer so that missing required
/// fields surface as a 400 validation error rather than a body-shape error.
#[derive(Deserialize)]
struct IngestRequest {
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default)]
    collection_id: Option<String>,
    #[serde(default)]
    storage_uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Success response for `POST /internal/ingest`.
#[derive(Serialize)]
struct IngestResponse {
    status: &'static str,
    document_id: String,
}

/// Accept a document for ingestion and schedule the background pipeline.
async fn ingest_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError>
where
    S: RagApi,
{
    let IngestRequest {
        document_id,
        collection_id,
        storage_uri,
        title,
    } = request;
    let (Some(document_id), Some(collection_id), Some(storage_uri)) =
        (document_id, collection_id, storage_uri)
    else {
        return Err(AppError::Validation("missing required fields"));
    };

    let record = service.queue_ingestion(IngestSubmission {
        document_id,
        collection_id,
        storage_uri,
        title: title
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "Untitled".to_string()),
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            status: "accepted",
            document_id: record.document_id,
        }),
    ))
}

/// Request body for `POST /internal/rag/query/stream`.
#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    kb_id: Option<String>,
}

/// Stream a retrieval-augmented answer as newline-terminated fragments.
///
/// The response is always a successful `text/plain` stream: pipeline
/// failures are masked downstream by the synthetic fallback.
async fn stream_rag_answer<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, AppError>
where
    S: RagApi,
{
    let QueryRequest {
        prompt,
        session_id,
        kb_id,
    } = request;
    let Some(prompt) = prompt.filter(|value| !value.is_empty()) else {
        return Err(AppError::Validation("prompt is required"));
    };
    let namespace = kb_id
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    tracing::info!(
        session = session_id.as_deref().unwrap_or(""),
        kb = %namespace,
        prompt = %prompt.chars().take(64).collect::<String>(),
        "Streaming answer"
    );

    let fragments = service.answer_stream(prompt, namespace);
    let body = Body::from_stream(
        fragments.map(|fragment| Ok::<_, Infallible>(Bytes::from(format!("{fragment}\n")))),
    );

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

/// Return the tracked record for a submitted document.
async fn document_status<S>(
    State(service): State<Arc<S>>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentRecord>, AppError>
where
    S: RagApi,
{
    service
        .document_status(&document_id)
        .map(Json)
        .ok_or(AppError::UnknownDocument)
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    vector_index: String,
    model: String,
}

/// Report service identity and readiness.
async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthResponse>
where
    S: RagApi,
{
    let info = service.service_info();
    Json(HealthResponse {
        status: "ok",
        vector_index: info.vector_index,
        model: info.model,
    })
}

/// Return a concise metrics snapshot with ingestion counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: RagApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    Validation(&'static str),
    Unauthorized,
    UnknownDocument,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(detail) => (StatusCode::BAD_REQUEST, detail).into_response(),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized").into_response(),
            Self::UnknownDocument => (StatusCode::NOT_FOUND, "unknown document").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        AnswerStream, DocumentRecord, DocumentStatus, IngestSubmission, RagApi, ServiceInfo,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubRagService {
        submissions: Mutex<Vec<IngestSubmission>>,
        queries: Mutex<Vec<(String, String)>>,
        record: Mutex<Option<DocumentRecord>>,
    }

    impl StubRagService {
        fn recorded_submissions(&self) -> Vec<IngestSubmission> {
            self.submissions.lock().expect("lock").clone()
        }

        fn recorded_queries(&self) -> Vec<(String, String)> {
            self.queries.lock().expect("lock").clone()
        }

        fn set_record(&self, record: DocumentRecord) {
            *self.record.lock().expect("lock") = Some(record);
        }
    }

    impl RagApi for StubRagService {
        fn queue_ingestion(&self, submission: IngestSubmission) -> DocumentRecord {
            let record = DocumentRecord {
                document_id: submission.document_id.clone(),
                collection_id: submission.collection_id.clone(),
                storage_uri: submission.storage_uri.clone(),
                title: submission.title.clone(),
                status: DocumentStatus::Processing,
                note: None,
                created_at: "2025-01-01T00:00:00Z".into(),
            };
            self.submissions.lock().expect("lock").push(submission);
            record
        }

        fn answer_stream(&self, prompt: String, namespace: String) -> AnswerStream {
            self.queries.lock().expect("lock").push((prompt, namespace));
            Box::pin(futures_util::stream::iter(vec![
                "one".to_string(),
                "two".to_string(),
            ]))
        }

        fn document_status(&self, document_id: &str) -> Option<DocumentRecord> {
            self.record
                .lock()
                .expect("lock")
                .clone()
                .filter(|record| record.document_id == document_id)
        }

        fn service_info(&self) -> ServiceInfo {
            ServiceInfo {
                vector_index: "kb-index".into(),
                model: "gpt-4.1-mini".into(),
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_ingested: 0,
                chunks_ingested: 0,
            }
        }
    }

    fn json_request(method: Method, uri: &str, payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_reports_index_and_model() {
        let app = create_router(Arc::new(StubRagService::default()), String::new());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["vector_index"], "kb-index");
        assert_eq!(json["model"], "gpt-4.1-mini");
    }

    #[tokio::test]
    async fn ingest_accepts_and_echoes_document_id() {
        let service = Arc::new(StubRagService::default());
        let app = create_router(service.clone(), String::new());

        let payload = json!({
            "document_id": "doc-42",
            "collection_id": "col-7",
            "storage_uri": "/data/report.pdf"
        });
        let response = app
            .oneshot(json_request(Method::POST, "/internal/ingest", payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["document_id"], "doc-42");

        let submissions = service.recorded_submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].document_id, "doc-42");
        assert_eq!(submissions[0].collection_id, "col-7");
        assert_eq!(submissions[0].title, "Untitled");
    }

    #[tokio::test]
    async fn ingest_without_required_fields_is_rejected() {
        let service = Arc::new(StubRagService::default());
        let app = create_router(service.clone(), String::new());

        let payload = json!({ "document_id": "doc-42" });
        let response = app
            .oneshot(json_request(Method::POST, "/internal/ingest", payload))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.recorded_submissions().is_empty());
    }

    #[tokio::test]
    async fn internal_routes_enforce_the_service_token() {
        let service = Arc::new(StubRagService::default());
        let app = create_router(service.clone(), "secret".to_string());

        let payload = json!({
            "document_id": "doc-1",
            "collection_id": "col-1",
            "storage_uri": "/data/a.txt"
        });

        let denied = app
            .clone()
            .oneshot(json_request(Method::POST, "/internal/ingest", payload.clone()))
            .await
            .expect("router response");
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
        assert!(service.recorded_submissions().is_empty());

        let wrong = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/internal/ingest")
                    .header("content-type", "application/json")
                    .header("x-service-token", "nope")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/internal/ingest")
                    .header("content-type", "application/json")
                    .header("x-service-token", "secret")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(allowed.status(), StatusCode::ACCEPTED);

        // the gate does not cover public routes
        let health = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_without_prompt_is_rejected() {
        let service = Arc::new(StubRagService::default());
        let app = create_router(service.clone(), String::new());

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/internal/rag/query/stream",
                json!({ "session_id": "s-1" }),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.recorded_queries().is_empty());
    }

    #[tokio::test]
    async fn query_streams_newline_terminated_fragments() {
        let service = Arc::new(StubRagService::default());
        let app = create_router(service.clone(), String::new());

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/internal/rag/query/stream",
                json!({ "prompt": "hello", "kb_id": "col-7" }),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get("content-type")
                .and_then(|value| value.to_str().ok())
                .expect("content type")
                .starts_with("text/plain")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(std::str::from_utf8(&body).expect("utf8 body"), "one\ntwo\n");

        let queries = service.recorded_queries();
        assert_eq!(queries, vec![("hello".to_string(), "col-7".to_string())]);
    }

    #[tokio::test]
    async fn query_defaults_the_namespace() {
        let service = Arc::new(StubRagService::default());
        let app = create_router(service.clone(), String::new());

        app.oneshot(json_request(
            Method::POST,
            "/internal/rag/query/stream",
            json!({ "prompt": "hello" }),
        ))
        .await
        .expect("router response");

        assert_eq!(
            service.recorded_queries(),
            vec![("hello".to_string(), "kb-default".to_string())]
        );
    }

    #[tokio::test]
    async fn document_status_round_trips_the_record() {
        let service = Arc::new(StubRagService::default());
        service.set_record(DocumentRecord {
            document_id: "doc-9".into(),
            collection_id: "col-1".into(),
            storage_uri: "/data/a.txt".into(),
            title: "Untitled".into(),
            status: DocumentStatus::Ready,
            note: Some("Upserted 2 chunks to Pinecone.".into()),
            created_at: "2025-01-01T00:00:00Z".into(),
        });
        let app = create_router(service, String::new());

        let found = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/internal/documents/doc-9")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(found.status(), StatusCode::OK);
        let body = to_bytes(found.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["status"], "ready");
        assert_eq!(json["note"], "Upserted 2 chunks to Pinecone.");

        let missing = app
            .oneshot(
                Request::builder()
                    .uri("/internal/documents/doc-404")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
