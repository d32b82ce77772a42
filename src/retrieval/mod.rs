//! Retrieval facade.
//!
//! [`RetrievalService`] owns the document index and composes the cache store,
//! the resilient embedder and the ranker. Nothing here returns an error: every
//! failure below it has a degraded-but-valid outcome.

mod index;
mod service;
mod types;


pub use index::{Corpus, IndexedDocument};
pub use service::RetrievalService;
pub use types::{DocumentState, ServiceStats, SyncReport, UpsertOutcome};
