//! Streaming answer generation against the OpenAI chat completions API.
//!
//! The client issues a single `stream: true` completion request and yields
//! content deltas as they arrive. Server-sent `data:` lines are parsed
//! straight off the byte stream; `[DONE]` terminates the stream.

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use thiserror::Error;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Sampling temperature used for every completion.
const TEMPERATURE: f64 = 0.3;

/// Errors raised while generating an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// HTTP layer failed before or while receiving the response.
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider responded with an unexpected status code.
    #[error("unexpected completions response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A `data:` payload in the event stream failed to parse.
    #[error("malformed stream payload: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Boxed stream of generated text fragments.
pub type GenerationStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// Streaming chat completions adapter.
pub struct ChatClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    /// Construct a client against the public OpenAI API.
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url: OPENAI_API_BASE.to_string(),
            api_key,
            model,
        }
    }

    /// Open a streaming completion for `question` grounded in `context`.
    ///
    /// The returned stream yields content deltas in arrival order and stops
    /// at the provider's `[DONE]` marker. Any transport or parse failure
    /// surfaces as an error item and ends the stream.
    pub fn stream_answer(&self, question: String, context: String) -> GenerationStream {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let api_key = self.api_key.clone();
        let model = self.model.clone();

        Box::pin(try_stream! {
            let body = json!({
                "model": model,
                "temperature": TEMPERATURE,
                "stream": true,
                "messages": [ { "role": "user", "content": render_prompt(&context, &question) } ],
            });

            let response = client
                .post(format!("{base}/chat/completions", base = base_url.trim_end_matches('/')))
                .bearer_auth(&api_key)
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(status = %status, "Completion request failed");
                Err(GenerationError::UnexpectedStatus { status, body })?;
            } else {
                let mut bytes = response.bytes_stream();
                let mut buffer = String::new();
                'receive: while let Some(chunk) = bytes.next().await {
                    let chunk = chunk?;
                    buffer.push_str(&String::from_utf8_lossy(&chunk));

                    while let Some(newline) = buffer.find('\n') {
                        let line = buffer[..newline].trim_end_matches('\r').to_string();
                        buffer.drain(..=newline);

                        let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
                            continue;
                        };
                        if payload == "[DONE]" {
                            break 'receive;
                        }

                        let parsed: StreamChunk = serde_json::from_str(payload)?;
                        if let Some(delta) = parsed
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content)
                            && !delta.is_empty()
                        {
                            yield delta;
                        }
                    }
                }
            }
        })
    }
}

/// Render the fixed answer prompt around retrieved context.
fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "You are AuroraMind's AI assistant. Use the provided context to answer concisely.\n\nContext: {context}\n\nQuestion: {question}"
    )
}
