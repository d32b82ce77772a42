//! Embedding generation.
//!
//! - [`provider`] talks to the external vectorization service.
//! - [`fallback`] derives a deterministic substitute vector from a text hash.
//! - [`resilient`] composes the two: it always yields a vector and never returns an error.

mod error;
/// Deterministic fallback vectors.
pub mod fallback;
#[cfg(any(test, feature = "mock"))]
mod mock;
/// External embedding providers.
pub mod provider;
/// Provider + timeout + fallback composition.
pub mod resilient;


pub use error::ProviderError;
pub use fallback::fallback_vector;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingProvider;
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider, UnavailableProvider};
pub use resilient::{Embedded, ResilientEmbedder};
