use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use super::error::ProviderError;
use super::fallback::fallback_vector;
use super::provider::EmbeddingProvider;

/// A vector plus whether it came from the fallback path.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub vector: Vec<f32>,
    pub fallback: bool,
}

impl Embedded {
    pub fn provided(vector: Vec<f32>) -> Self {
        Self {
            vector,
            fallback: false,
        }
    }

    pub fn fallback(vector: Vec<f32>) -> Self {
        Self {
            vector,
            fallback: true,
        }
    }
}

/// Wraps an [`EmbeddingProvider`] with a hard per-call timeout and deterministic
/// fallback. [`ResilientEmbedder::embed`] cannot fail.
#[derive(Clone)]
pub struct ResilientEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    fallback_dim: usize,
    provider_calls: Arc<AtomicU64>,
    fallbacks: Arc<AtomicU64>,
}

impl std::fmt::Debug for ResilientEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientEmbedder")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .field("fallback_dim", &self.fallback_dim)
            .finish()
    }
}

impl ResilientEmbedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        timeout: Duration,
        fallback_dim: usize,
    ) -> Self {
        Self {
            provider,
            timeout,
            fallback_dim,
            provider_calls: Arc::new(AtomicU64::new(0)),
            fallbacks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Calls the provider; on any [`ProviderError`] returns the fallback vector.
    pub async fn embed(&self, text: &str) -> Embedded {
        match self.try_provider(text).await {
            Ok(vector) => Embedded::provided(vector),
            Err(err) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    provider = self.provider.name(),
                    error_kind = err.kind(),
                    error = %err,
                    text_len = text.len(),
                    "Embedding provider failed, using deterministic fallback"
                );
                Embedded::fallback(fallback_vector(text, self.fallback_dim))
            }
        }
    }

    /// Calls the provider only, surfacing its error. Used when a fallback is
    /// not acceptable, e.g. when upgrading entries that already are fallbacks.
    pub async fn try_provider(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);

        // The provider gets the timeout too; this outer bound covers providers
        // that ignore it.
        match tokio::time::timeout(self.timeout, self.provider.embed(text, self.timeout)).await {
            Ok(Ok(vector)) if vector.is_empty() => Err(ProviderError::EmptyResponse),
            Ok(Ok(vector)) => {
                debug!(dim = vector.len(), "Embedding generated by provider");
                Ok(vector)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ProviderError::Timeout {
                elapsed_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fallback_dim(&self) -> usize {
        self.fallback_dim
    }

    /// Number of provider attempts so far.
    pub fn provider_calls(&self) -> u64 {
        self.provider_calls.load(Ordering::Relaxed)
    }

    /// Number of fallback vectors produced so far.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}
