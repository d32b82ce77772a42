//! Whole-file JSON persistence: `{"embeddings": {...}, "metadata": {...}}`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::error::{CacheIoError, CacheIoResult};
use super::model::{CacheEntry, EntryKind, EntryMeta, OriginType};
use crate::hashing::ContentHash;

#[derive(Serialize)]
struct PersistedCacheRef<'a> {
    embeddings: BTreeMap<String, &'a [f32]>,
    metadata: BTreeMap<String, &'a EntryMeta>,
}

#[derive(Default, Deserialize)]
struct PersistedCache {
    #[serde(default)]
    embeddings: HashMap<String, Vec<f32>>,
    #[serde(default)]
    metadata: HashMap<String, RawEntryMeta>,
}

/// Lenient metadata shape; older or hand-edited files may omit fields.
#[derive(Deserialize)]
struct RawEntryMeta {
    #[serde(default)]
    source: String,
    #[serde(rename = "type")]
    kind: Option<EntryKind>,
    origin: Option<OriginType>,
    generated_at: Option<DateTime<Utc>>,
}

impl RawEntryMeta {
    fn into_meta(self) -> EntryMeta {
        let kind = self.kind.unwrap_or(EntryKind::Query);
        let origin = self.origin.unwrap_or(match kind {
            EntryKind::Document => OriginType::Document,
            EntryKind::Query | EntryKind::Fallback => OriginType::Query,
        });
        EntryMeta {
            source: self.source,
            kind,
            origin,
            generated_at: self.generated_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

fn orphan_meta() -> EntryMeta {
    EntryMeta {
        source: String::new(),
        kind: EntryKind::Query,
        origin: OriginType::Query,
        generated_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

pub(super) fn encode<'a>(
    entries: impl Iterator<Item = &'a CacheEntry>,
) -> CacheIoResult<Vec<u8>> {
    let mut doc = PersistedCacheRef {
        embeddings: BTreeMap::new(),
        metadata: BTreeMap::new(),
    };
    for entry in entries {
        let key = entry.key.to_hex();
        doc.embeddings.insert(key.clone(), &entry.vector[..]);
        doc.metadata.insert(key, &entry.meta);
    }
    Ok(serde_json::to_vec(&doc)?)
}

/// Reads the persisted file. Missing or corrupt files yield an empty list.
pub(super) fn read_entries(path: &Path) -> Vec<CacheEntry> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "No embedding cache on disk, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Embedding cache unreadable, starting empty");
            return Vec::new();
        }
    };

    let persisted: PersistedCache = match serde_json::from_slice(&bytes) {
        Ok(persisted) => persisted,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Embedding cache corrupt, starting empty");
            return Vec::new();
        }
    };

    decode(persisted)
}

fn decode(persisted: PersistedCache) -> Vec<CacheEntry> {
    let PersistedCache {
        embeddings,
        mut metadata,
    } = persisted;

    let mut entries = Vec::with_capacity(embeddings.len());
    let mut dropped = 0usize;

    for (hex, vector) in embeddings {
        let raw_meta = metadata.remove(&hex);
        let Some(key) = ContentHash::from_hex(&hex) else {
            dropped += 1;
            continue;
        };
        if vector.is_empty() || vector.iter().any(|x| !x.is_finite()) {
            dropped += 1;
            continue;
        }
        let meta = raw_meta.map(RawEntryMeta::into_meta).unwrap_or_else(orphan_meta);
        entries.push(CacheEntry {
            key,
            vector: Arc::from(vector),
            meta,
        });
    }

    dropped += metadata.len();
    if dropped > 0 {
        warn!(dropped, "Dropped invalid or incomplete embedding cache entries");
    }

    entries
}

/// Writes `bytes` to a temp file next to `path`, syncs it, then renames it over `path`.
pub(super) fn write_atomic(path: &Path, bytes: &[u8]) -> CacheIoResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| CacheIoError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
