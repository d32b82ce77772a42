use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedded;
use crate::hashing::ContentHash;

/// Characters of query text kept as a query entry's origin id.
const QUERY_SOURCE_CHARS: usize = 80;

/// What produced the key: a corpus document or a query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginType {
    Document,
    Query,
}

/// The persisted `type` tag: the origin type, or `fallback` when the vector was
/// synthesized locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Document,
    Query,
    Fallback,
}

impl EntryKind {
    fn from_origin(origin: OriginType, fallback: bool) -> Self {
        match (origin, fallback) {
            (_, true) => EntryKind::Fallback,
            (OriginType::Document, false) => EntryKind::Document,
            (OriginType::Query, false) => EntryKind::Query,
        }
    }
}

/// Who a cache write is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub id: String,
    pub kind: OriginType,
}

impl Origin {
    pub fn document(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: OriginType::Document,
        }
    }

    /// Query origins record a prefix of the query text as their id.
    pub fn query(text: &str) -> Self {
        Self {
            id: text.chars().take(QUERY_SOURCE_CHARS).collect(),
            kind: OriginType::Query,
        }
    }
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Origin id (document id, or query text prefix).
    pub source: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub origin: OriginType,
    pub generated_at: DateTime<Utc>,
}

impl EntryMeta {
    pub fn new(origin: &Origin, fallback: bool) -> Self {
        Self {
            source: origin.id.clone(),
            kind: EntryKind::from_origin(origin.kind, fallback),
            origin: origin.kind,
            generated_at: Utc::now(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == EntryKind::Fallback
    }
}

/// One cached embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: ContentHash,
    pub vector: Arc<[f32]>,
    pub meta: EntryMeta,
}

impl CacheEntry {
    pub fn new(key: ContentHash, origin: &Origin, embedded: Embedded) -> Self {
        Self {
            key,
            meta: EntryMeta::new(origin, embedded.fallback),
            vector: Arc::from(embedded.vector),
        }
    }
}
