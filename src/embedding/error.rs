use thiserror::Error;

/// Failure of the external embedding call.
///
/// Always absorbed by [`ResilientEmbedder`](super::ResilientEmbedder), which
/// substitutes a fallback vector.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("embedding request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("embedding transport failed: {reason}")]
    Transport { reason: String },

    #[error("embedding service returned status {status}")]
    Status { status: u16 },

    #[error("embedding service returned an empty vector")]
    EmptyResponse,

    #[error("malformed embedding response: {reason}")]
    Malformed { reason: String },

    #[error("no embedding provider configured")]
    Unavailable,
}

impl ProviderError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::Transport { .. } => "transport",
            ProviderError::Status { .. } => "status",
            ProviderError::EmptyResponse => "empty",
            ProviderError::Malformed { .. } => "malformed",
            ProviderError::Unavailable => "unavailable",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed {
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ProviderError::Status {
                status: status.as_u16(),
            }
        } else {
            ProviderError::Transport {
                reason: err.to_string(),
            }
        }
    }
}
