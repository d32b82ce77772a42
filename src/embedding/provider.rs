//! External embedding providers.
//!
//! Providers only move text to a vectorization service and back. Caching lives in
//! [`crate::storage`], fallback synthesis in [`super::resilient`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ProviderError;

/// A vectorization backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text`, giving up after `timeout`.
    async fn embed(&self, text: &str, timeout: Duration) -> Result<Vec<f32>, ProviderError>;

    /// Short backend label for logs.
    fn name(&self) -> &str;
}

/// Provider used when no endpoint is configured; every call fails with
/// [`ProviderError::Unavailable`] so callers always take the fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

#[async_trait]
impl EmbeddingProvider for UnavailableProvider {
    async fn embed(&self, _text: &str, _timeout: Duration) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Unavailable)
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Accepted response shapes: `{"vector": [...]}`, `{"embedding": [...]}` and
/// the batch form `{"embeddings": [[...]]}` (first row wins).
#[derive(Debug, Default, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    vector: Option<Vec<f32>>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
}

impl EmbedResponse {
    fn into_vector(self) -> Option<Vec<f32>> {
        self.vector
            .or(self.embedding)
            .or_else(|| self.embeddings.and_then(|rows| rows.into_iter().next()))
    }
}

/// JSON-over-HTTP embedding client (Ollama `/api/embed` compatible).
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpEmbeddingProvider {
    /// Creates a client posting to `endpoint` with the given model identifier.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, model)
    }

    /// Creates a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str, timeout: Duration) -> Result<Vec<f32>, ProviderError> {
        let started = Instant::now();
        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify(e, started))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let body: EmbedResponse = response.json().await.map_err(|e| classify(e, started))?;
        let vector = body.into_vector().ok_or(ProviderError::EmptyResponse)?;
        validate_vector(&vector)?;

        debug!(
            model = %self.model,
            dim = vector.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Provider returned embedding"
        );

        Ok(vector)
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn classify(err: reqwest::Error, started: Instant) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    } else {
        ProviderError::from(err)
    }
}

/// Rejects empty vectors and vectors carrying non-finite components.
pub fn validate_vector(vector: &[f32]) -> Result<(), ProviderError> {
    if vector.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    if let Some(position) = vector.iter().position(|x| !x.is_finite()) {
        return Err(ProviderError::Malformed {
            reason: format!("non-finite component at index {position}"),
        });
    }
    Ok(())
}
