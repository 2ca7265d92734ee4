//! HTTP implementation of the completion transport
//!
//! Posts `{ session_id, prompt, stream }` as JSON to a single configured
//! endpoint. With `stream: false` the endpoint answers with a JSON
//! envelope carrying the assistant text at `choices[0].message.content`;
//! with `stream: true` it answers with a chunked body of unframed UTF-8
//! text fragments.

use crate::config::ApiConfig;
use crate::error::{ChatVaultError, Result};
use crate::transport::{CompletionChunks, CompletionTransport, NO_RESPONSE_PLACEHOLDER};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// JSON body sent to the completion endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    session_id: String,
    prompt: &'a str,
    stream: bool,
}

/// Non-streamed response envelope
///
/// Every field defaults so that an envelope missing the expected path
/// still deserializes; the missing content then resolves to the fixed
/// placeholder rather than failing the caller.
#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: CompletionMessage,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Assistant text from an envelope, or the placeholder when absent/empty
fn extract_content(envelope: CompletionEnvelope) -> String {
    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string())
}

/// HTTP client for the remote completion endpoint
///
/// # Examples
///
/// ```no_run
/// use chatvault::transport::{CompletionTransport, HttpCompletionClient};
/// use std::time::Duration;
/// use uuid::Uuid;
///
/// let client =
///     HttpCompletionClient::new("http://localhost:8080/api/chat", Duration::from_secs(120))
///         .unwrap();
/// // Request a completion for a session's prompt
/// # tokio_test::block_on(async {
/// # let reply = client.complete(Uuid::new_v4(), "Hello!").await;
/// # });
/// ```
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
}

impl HttpCompletionClient {
    /// Create a client for the given endpoint
    ///
    /// The timeout bounds the whole request, including reads of a
    /// streamed body.
    ///
    /// # Errors
    ///
    /// Returns `ChatVaultError::Transport` if the underlying HTTP client
    /// cannot be constructed
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatVaultError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client from the API configuration section
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_seconds))
    }

    async fn post(&self, session_id: Uuid, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let request = CompletionRequest {
            session_id: session_id.to_string(),
            prompt,
            stream,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ChatVaultError::Transport(format!("Request to {} failed: {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Completion endpoint returned error {}: {}", status, error_text);
            return Err(ChatVaultError::Transport(format!(
                "Completion endpoint error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionTransport for HttpCompletionClient {
    async fn complete(&self, session_id: Uuid, prompt: &str) -> Result<String> {
        tracing::debug!(%session_id, "Requesting single-shot completion");
        let response = self.post(session_id, prompt, false).await?;

        let envelope: CompletionEnvelope = response.json().await.map_err(|e| {
            ChatVaultError::MalformedResponse(format!("Failed to parse completion envelope: {}", e))
        })?;

        Ok(extract_content(envelope))
    }

    async fn stream(&self, session_id: Uuid, prompt: &str) -> Result<CompletionChunks> {
        tracing::debug!(%session_id, "Requesting streamed completion");
        let response = self.post(session_id, prompt, true).await?;

        let chunks = response.bytes_stream().map(|result| {
            result.map_err(|e| ChatVaultError::Transport(format!("Stream read failed: {}", e)).into())
        });

        Ok(chunks.boxed())
    }
}
