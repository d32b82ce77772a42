//! Similarity ranking.
//!
//! Candidates are scored by cosine similarity mapped onto `[0, 1]`, nudged by a
//! bounded lexical boost, filtered by a threshold and ordered deterministically.
//! When too few candidates survive, a keyword pass over the whole corpus fills
//! the remaining slots with scores strictly below every embedding-derived score.
//!
//! All tunables live in [`RankingConfig`], which can be loaded from JSON.

pub mod config;
pub mod error;
pub mod ranker;
pub mod similarity;
pub mod types;


pub use config::{QueryExpansion, RankingConfig};
pub use error::ScoringError;
pub use ranker::{Candidate, SimilarityRanker};
pub use similarity::{cosine_score, cosine_similarity};
pub use types::{MatchSource, RankedResult};
