//! Cross-cutting, shared constants.
//!
//! Ranking and enrichment defaults live here so the config layer, the ranker and
//! the corpus loader agree on them. Runtime overrides go through
//! [`crate::config::Config`] and [`crate::scoring::RankingConfig`].
//!
//! # Dimension Invariants
//!
//! Provider vectors come back in the service's native dimension, while fallback
//! vectors are synthesized at [`DEFAULT_EMBEDDING_DIM`] unless configured otherwise.
//! Use [`validate_embedding_dim`] where vectors from different origins meet.

pub const DEFAULT_EMBEDDING_DIM: usize = 384;

pub const DEFAULT_TOP_K: usize = 3;

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.2;

pub const DEFAULT_BOOST_CEILING: f32 = 0.3;

pub const DEFAULT_CATEGORY_BONUS: f32 = 0.05;

pub const DEFAULT_KEYWORD_MAX_SCORE: f32 = 0.8;

pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 60_000;

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

pub const DEFAULT_WORKERS: usize = 4;

pub const DEFAULT_MIN_CONTENT_CHARS: usize = 32;

/// Characters kept from each structured field when building enriched text.
pub const ENRICH_FIELD_CHARS: usize = 300;
pub const ENRICH_NOTES_CHARS: usize = 200;
pub const ENRICH_COMPANION_CHARS: usize = 500;
pub const ENRICH_FREEFORM_CHARS: usize = 1_500;
pub const ENRICH_MAX_RESOURCES: usize = 5;
pub const ENRICH_MAX_STAGES: usize = 3;
pub const ENRICH_MAX_TASKS_PER_STAGE: usize = 2;

/// Error returned when two vectors that must be compared disagree on dimension.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DimValidationError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use exemplar::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// validate_embedding_dim(384, DEFAULT_EMBEDDING_DIM).unwrap();
/// assert!(validate_embedding_dim(768, DEFAULT_EMBEDDING_DIM).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
