use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::ProviderError;
use super::fallback::normalize;
use super::provider::EmbeddingProvider;
use crate::hashing::hash_to_u64;

/// Bag-of-words provider for tests: each lowercase alphanumeric token adds 1.0
/// to a hashed bucket, then the vector is normalized. Texts sharing words get
/// proportionally similar vectors.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dim: usize,
    failing: Arc<AtomicBool>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl MockEmbeddingProvider {
    pub fn bag_of_words(dim: usize) -> Self {
        Self {
            dim,
            failing: Arc::new(AtomicBool::new(false)),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider whose every call fails with a transport error.
    pub fn failing(dim: usize) -> Self {
        let provider = Self::bag_of_words(dim);
        provider.set_failing(true);
        provider
    }

    /// Sleeps before answering (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.inputs.lock().clear();
    }

    /// Texts received so far, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        if self.dim == 0 {
            return vector;
        }
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (hash_to_u64(token.as_bytes()) % self.dim as u64) as usize;
            vector[bucket] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str, _timeout: Duration) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().push(text.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport {
                reason: "mock provider offline".to_string(),
            });
        }

        let vector = self.vector_for(text);
        if vector.iter().all(|x| *x == 0.0) {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
