//! Exemplar library crate (used by the binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`RetrievalService`] - Upsert, query and invalidate over an owned document index
//! - [`EmbeddingCacheStore`], [`CacheEntry`] - Persistent `hash -> vector` cache
//! - [`CorpusLoader`], [`ExemplarDocument`] - Corpus scanning and enrichment
//! - [`SimilarityRanker`], [`RankingConfig`], [`RankedResult`] - Scoring and ordering
//! - [`Config`], [`ConfigError`] - Environment configuration
//!
//! ## Embedding
//! - [`EmbeddingProvider`], [`HttpEmbeddingProvider`] - External vectorization
//! - [`ResilientEmbedder`], [`fallback_vector`] - Timeout plus deterministic fallback
//!
//! ## Utilities
//! - [`ContentHash`], [`hash_bytes`], [`hash_text`] - Cache identity
//! - [`validate_embedding_dim`] - Dimension validation
//!
//! ## Test/Mock Support
//! [`MockEmbeddingProvider`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod corpus;
pub mod embedding;
pub mod hashing;
pub mod retrieval;
pub mod scoring;
pub mod storage;

pub use config::{Config, ConfigError};
pub use constants::{DimValidationError, validate_embedding_dim};
pub use corpus::{
    CorpusConfig, CorpusLoadError, CorpusLoader, DocumentBody, EnrichmentLimits,
    ExemplarDocument, LoadReport,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbeddingProvider;
pub use embedding::{
    Embedded, EmbeddingProvider, HttpEmbeddingProvider, ProviderError, ResilientEmbedder,
    UnavailableProvider, fallback_vector,
};
pub use hashing::{ContentHash, hash_byte_parts, hash_bytes, hash_text};
pub use retrieval::{DocumentState, RetrievalService, ServiceStats, SyncReport, UpsertOutcome};
pub use scoring::{
    MatchSource, RankedResult, RankingConfig, ScoringError, SimilarityRanker, cosine_score,
    cosine_similarity,
};
pub use storage::{CacheEntry, CacheIoError, EmbeddingCacheStore, EntryKind, Origin, StoreStats};
