//! Embedding cache store.
//!
//! A persistent `hash -> vector` map with an in-memory mirror. The store only does
//! exact key lookups; deciding *whether* a document's key is stale belongs to
//! [`crate::retrieval::RetrievalService`].

pub mod error;
mod model;
mod persist;
mod store;

#[cfg(test)]
mod tests;

pub use error::{CacheIoError, CacheIoResult};
pub use model::{CacheEntry, EntryKind, EntryMeta, Origin, OriginType};
pub use store::{BatchGuard, EmbeddingCacheStore, StoreStats};
