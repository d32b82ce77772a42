use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{CacheIoError, CacheIoResult};
use super::model::{CacheEntry, Origin, OriginType};
use super::persist;
use crate::embedding::Embedded;
use crate::hashing::ContentHash;

#[derive(Debug, Default)]
struct CacheMirror {
    entries: HashMap<ContentHash, CacheEntry>,
    /// Document id -> key of its most recent content.
    by_document: HashMap<String, ContentHash>,
    /// Key -> every document id whose current content hashes to it.
    holders: HashMap<ContentHash, BTreeSet<String>>,
}

impl CacheMirror {
    fn from_entries(entries: Vec<CacheEntry>) -> Self {
        let mut mirror = Self::default();
        for entry in entries {
            mirror.upsert(entry);
        }
        mirror
    }

    fn upsert(&mut self, entry: CacheEntry) {
        if entry.meta.origin == OriginType::Document {
            self.link(&entry.meta.source, entry.key);
        }
        self.entries.insert(entry.key, entry);
    }

    /// Points `id` at `key`, detaching it from whatever key it held before.
    fn link(&mut self, id: &str, key: ContentHash) {
        if let Some(previous) = self.by_document.insert(id.to_string(), key)
            && previous != key
        {
            self.detach(id, &previous);
        }
        self.holders.entry(key).or_default().insert(id.to_string());
    }

    fn detach(&mut self, id: &str, key: &ContentHash) {
        if let Some(ids) = self.holders.get_mut(key) {
            ids.remove(id);
            if ids.is_empty() {
                self.holders.remove(key);
            }
        }
    }

    /// Drops `id`'s claim on `key`. Returns `true` if no document holds `key` anymore.
    fn release(&mut self, id: &str, key: &ContentHash) -> bool {
        if self.by_document.get(id) == Some(key) {
            self.by_document.remove(id);
        }
        self.detach(id, key);
        !self.holders.contains_key(key)
    }

    fn remove(&mut self, key: &ContentHash) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        for id in self.holders.remove(key).unwrap_or_default() {
            if self.by_document.get(&id) == Some(key) {
                self.by_document.remove(&id);
            }
        }
        Some(removed)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.by_document.clear();
        self.holders.clear();
    }
}

#[derive(Debug, Default)]
struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time counters for an [`EmbeddingCacheStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct StoreStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub dirty: bool,
}

/// Persistent `hash -> vector` map with an in-memory mirror.
///
/// Mirror updates are synchronous and short. Persisting a snapshot runs on the
/// blocking pool, one writer at a time. A failed write keeps the mirror
/// authoritative and marks the store dirty; the next write retries.
///
/// Several documents with identical bytes share one key. The key is only
/// evicted on their behalf once none of them still holds it.
pub struct EmbeddingCacheStore {
    path: Option<PathBuf>,
    mirror: RwLock<CacheMirror>,
    writer: Mutex<()>,
    batch_depth: AtomicUsize,
    dirty: AtomicBool,
    counters: StoreCounters,
}

impl std::fmt::Debug for EmbeddingCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCacheStore")
            .field("path", &self.path)
            .field("entries", &self.len())
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

impl EmbeddingCacheStore {
    /// Loads the store persisted at `path`.
    ///
    /// A missing or corrupt file starts an empty store; the file is rewritten on
    /// the first confirmed write.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = persist::read_entries(&path);
        let mirror = CacheMirror::from_entries(entries);

        info!(
            path = %path.display(),
            entries = mirror.entries.len(),
            documents = mirror.by_document.len(),
            "Embedding cache loaded"
        );

        Self::with_mirror(Some(path), mirror)
    }

    /// Creates a store with no backing file (nothing is ever persisted).
    pub fn in_memory() -> Self {
        Self::with_mirror(None, CacheMirror::default())
    }

    fn with_mirror(path: Option<PathBuf>, mirror: CacheMirror) -> Self {
        Self {
            path,
            mirror: RwLock::new(mirror),
            writer: Mutex::new(()),
            batch_depth: AtomicUsize::new(0),
            dirty: AtomicBool::new(false),
            counters: StoreCounters::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the cached vector for `key`, or runs `compute`, stores its result
    /// under `key` and persists the store.
    ///
    /// A document-origin hit still records the document as a holder of `key`.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: ContentHash,
        origin: Origin,
        compute: F,
    ) -> Arc<[f32]>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Embedded>,
    {
        if let Some(vector) = self.vector(&key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            if origin.kind == OriginType::Document {
                self.link_document(&origin.id, key);
            }
            debug!(key = %key.short(), origin = %origin.id, "Embedding cache hit");
            return vector;
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key.short(), origin = %origin.id, "Embedding cache miss");

        let embedded = compute().await;
        self.insert(key, &origin, embedded).await
    }

    /// Upserts an entry and persists (unless a batch is open).
    pub async fn insert(
        &self,
        key: ContentHash,
        origin: &Origin,
        embedded: Embedded,
    ) -> Arc<[f32]> {
        let entry = CacheEntry::new(key, origin, embedded);
        let vector = Arc::clone(&entry.vector);

        self.mirror.write().upsert(entry);
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        self.mark_dirty_and_maybe_persist().await;

        vector
    }

    /// Records `id` as a holder of the already cached `key`. In memory only.
    pub fn link_document(&self, id: &str, key: ContentHash) {
        let mut mirror = self.mirror.write();
        if mirror.entries.contains_key(&key) {
            mirror.link(id, key);
        }
    }

    /// Removes `key`; the next access recomputes it. Returns `true` if it existed.
    pub async fn invalidate(&self, key: &ContentHash) -> bool {
        let removed = self.mirror.write().remove(key).is_some();
        if removed {
            debug!(key = %key.short(), "Embedding cache entry invalidated");
            self.mark_dirty_and_maybe_persist().await;
        }
        removed
    }

    /// Drops `document_id`'s claim on `key` and evicts `key` once no other
    /// document holds it. Returns `true` if the entry was evicted.
    pub async fn release_document(&self, document_id: &str, key: &ContentHash) -> bool {
        let unheld = self.mirror.write().release(document_id, key);
        if !unheld {
            debug!(
                document_id,
                key = %key.short(),
                "Embedding still held by another document, keeping it"
            );
            return false;
        }
        self.invalidate(key).await
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        let removed = {
            let mut mirror = self.mirror.write();
            let count = mirror.entries.len();
            mirror.clear();
            count
        };
        info!(removed, "Embedding cache cleared");
        self.mark_dirty_and_maybe_persist().await;
    }

    /// Returns a clone of the entry under `key`.
    pub fn get(&self, key: &ContentHash) -> Option<CacheEntry> {
        self.mirror.read().entries.get(key).cloned()
    }

    /// Returns the vector under `key` without touching hit/miss counters.
    pub fn vector(&self, key: &ContentHash) -> Option<Arc<[f32]>> {
        self.mirror
            .read()
            .entries
            .get(key)
            .map(|entry| Arc::clone(&entry.vector))
    }

    pub fn contains(&self, key: &ContentHash) -> bool {
        self.mirror.read().entries.contains_key(key)
    }

    /// The key recorded for `document_id`'s latest content.
    pub fn recorded_hash(&self, document_id: &str) -> Option<ContentHash> {
        self.mirror.read().by_document.get(document_id).copied()
    }

    /// Document ids currently holding `key`, in ascending order.
    pub fn holders(&self, key: &ContentHash) -> Vec<String> {
        self.mirror
            .read()
            .holders
            .get(key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.mirror.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the mirror holds changes not yet on disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            entries: self.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
            dirty: self.is_dirty(),
        }
    }

    /// Persists the mirror now if it has unflushed changes.
    pub async fn flush(&self) -> CacheIoResult<()> {
        let _writer = self.writer.lock().await;
        if !self.is_dirty() {
            return Ok(());
        }
        self.persist_locked().await
    }

    /// Defers persistence until the outermost guard is finished.
    pub fn begin_batch(&self) -> BatchGuard<'_> {
        self.batch_depth.fetch_add(1, Ordering::AcqRel);
        BatchGuard {
            store: self,
            finished: false,
        }
    }

    async fn mark_dirty_and_maybe_persist(&self) {
        self.dirty.store(true, Ordering::Release);
        if self.batch_depth.load(Ordering::Acquire) == 0 {
            // Failures are logged and counted inside; the mirror stays authoritative.
            let _ = self.flush().await;
        }
    }

    /// Caller must hold `writer`.
    async fn persist_locked(&self) -> CacheIoResult<()> {
        let Some(path) = self.path.clone() else {
            self.dirty.store(false, Ordering::Release);
            return Ok(());
        };

        // Cleared before the snapshot so any later mutation re-marks the store.
        self.dirty.store(false, Ordering::Release);
        let snapshot: Vec<CacheEntry> = self.mirror.read().entries.values().cloned().collect();

        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let bytes = persist::encode(snapshot.iter())?;
            persist::write_atomic(&target, &bytes)
        })
        .await
        .map_err(CacheIoError::from)
        .and_then(|written| written);

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "Embedding cache persisted");
                Ok(())
            }
            Err(err) => {
                self.dirty.store(true, Ordering::Release);
                self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to persist embedding cache; continuing in memory"
                );
                Err(err)
            }
        }
    }
}

/// Open persistence batch; [`BatchGuard::finish`] on the outermost guard flushes.
///
/// A guard dropped without `finish` ends the batch but leaves the store dirty;
/// the next write or [`EmbeddingCacheStore::flush`] persists it.
#[must_use = "call `finish` to end the batch and persist"]
pub struct BatchGuard<'a> {
    store: &'a EmbeddingCacheStore,
    finished: bool,
}

impl BatchGuard<'_> {
    /// Ends the batch and reports the flush result.
    pub async fn finish(mut self) -> CacheIoResult<()> {
        self.finished = true;
        if self.store.batch_depth.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.store.flush().await
        } else {
            Ok(())
        }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.batch_depth.fetch_sub(1, Ordering::AcqRel);
            debug!(dirty = self.store.is_dirty(), "Persistence batch dropped unfinished");
        }
    }
}
