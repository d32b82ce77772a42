use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{self, StreamExt};
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use super::index::{Corpus, IndexedDocument};
use super::types::{DocumentState, ServiceStats, SyncReport, UpsertOutcome};
use crate::constants::DEFAULT_WORKERS;
use crate::corpus::ExemplarDocument;
use crate::embedding::{Embedded, ResilientEmbedder};
use crate::hashing::hash_text;
use crate::scoring::{Candidate, RankedResult, SimilarityRanker};
use crate::storage::{CacheIoResult, EmbeddingCacheStore, Origin};

/// Keeps document embeddings fresh and answers similarity queries.
pub struct RetrievalService {
    store: Arc<EmbeddingCacheStore>,
    embedder: ResilientEmbedder,
    ranker: SimilarityRanker,
    corpus: RwLock<Corpus>,
    workers: usize,
    queries: AtomicU64,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("store", &self.store)
            .field("embedder", &self.embedder)
            .field("documents", &self.len())
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl RetrievalService {
    pub fn new(
        store: Arc<EmbeddingCacheStore>,
        embedder: ResilientEmbedder,
        ranker: SimilarityRanker,
    ) -> Self {
        Self {
            store,
            embedder,
            ranker,
            corpus: RwLock::new(Corpus::default()),
            workers: DEFAULT_WORKERS,
            queries: AtomicU64::new(0),
        }
    }

    /// Bounds how many documents [`RetrievalService::sync_corpus`] embeds at once.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn store(&self) -> &Arc<EmbeddingCacheStore> {
        &self.store
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }

    pub fn embedder(&self) -> &ResilientEmbedder {
        &self.embedder
    }

    /// Makes `document`'s embedding fresh and (re)indexes it.
    ///
    /// A recorded hash that differs from the document's current hash is
    /// released first, and evicted unless another document still holds it, so
    /// the lookup below can only hit on the document's current bytes.
    #[instrument(skip(self, document), fields(document_id = document.id()))]
    pub async fn upsert(&self, document: ExemplarDocument) -> UpsertOutcome {
        let key = document.content_hash();
        let stale = self
            .store
            .recorded_hash(document.id())
            .filter(|recorded| *recorded != key);

        if let Some(old) = stale {
            debug!(old = %old.short(), new = %key.short(), "Document content changed");
            self.store.release_document(document.id(), &old).await;
        }

        let outcome = match (self.store.contains(&key), stale.is_some()) {
            (true, _) => UpsertOutcome::Cached,
            (false, true) => UpsertOutcome::Regenerated,
            (false, false) => UpsertOutcome::Generated,
        };

        let vector = self
            .store
            .get_or_compute(key, Origin::document(document.id()), || {
                self.embedder.embed(document.enriched_text())
            })
            .await;

        debug!(?outcome, dim = vector.len(), "Document indexed");
        self.corpus.write().insert(IndexedDocument {
            document: Arc::new(document),
            vector,
        });
        outcome
    }

    /// Upserts a freshly loaded corpus and drops indexed documents absent from it.
    ///
    /// Embeddings are computed by at most `workers` concurrent upserts, and the
    /// cache file is written once at the end.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn sync_corpus(&self, documents: Vec<ExemplarDocument>) -> SyncReport {
        let incoming: HashSet<String> = documents.iter().map(|d| d.id().to_string()).collect();

        // Claim unchanged content up front so a concurrently upserted twin with
        // edited bytes cannot release a key this document still needs.
        for document in &documents {
            let key = document.content_hash();
            if self
                .store
                .recorded_hash(document.id())
                .is_none_or(|recorded| recorded == key)
            {
                self.store.link_document(document.id(), key);
            }
        }

        let batch = self.store.begin_batch();

        let outcomes: Vec<UpsertOutcome> = stream::iter(documents)
            .map(|document| self.upsert(document))
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut report = SyncReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }

        {
            let mut corpus = self.corpus.write();
            let vanished: Vec<String> = corpus
                .ids()
                .filter(|id| !incoming.contains(*id))
                .map(str::to_string)
                .collect();
            for id in &vanished {
                debug!(document_id = %id, "Dropping document no longer in corpus");
                corpus.remove(id);
            }
            report.removed = vanished.len();
        }

        if let Err(err) = batch.finish().await {
            warn!(error = %err, "Embedding cache not persisted after sync; continuing in memory");
        }

        info!(
            cached = report.cached,
            generated = report.generated,
            regenerated = report.regenerated,
            removed = report.removed,
            "Corpus synchronised"
        );
        report
    }

    /// Ranks indexed documents against `text`. Returns at most `k` results.
    ///
    /// The query is expanded before embedding and its vector is cached under
    /// the hash of the expanded text.
    #[instrument(skip(self, text), fields(query_len = text.len()))]
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        category_hint: Option<&str>,
    ) -> Vec<RankedResult> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let snapshot: Vec<IndexedDocument> = self.corpus.read().entries().cloned().collect();
        if k == 0 || snapshot.is_empty() {
            debug!(documents = snapshot.len(), "Nothing to rank");
            return Vec::new();
        }

        let expanded = self.ranker.expand_query(text);
        let key = hash_text(&expanded);
        let query_vector = self
            .store
            .get_or_compute(key, Origin::query(text), || self.embedder.embed(&expanded))
            .await;

        let candidates: Vec<Candidate<'_>> =
            snapshot.iter().map(IndexedDocument::candidate).collect();
        let results = self
            .ranker
            .rank(&query_vector, text, &candidates, category_hint, k);

        info!(
            candidates = candidates.len(),
            returned = results.len(),
            best_score = results.first().map(|r| r.score),
            "Query ranked"
        );
        results
    }

    /// Drops `id` from the index and releases its embedding, which is evicted
    /// unless another document with identical bytes still holds it.
    /// Returns `true` if the index or the cache held it.
    pub async fn invalidate(&self, id: &str) -> bool {
        let removed = self.corpus.write().remove(id);
        let key = removed
            .as_ref()
            .map(|entry| entry.document.content_hash())
            .or_else(|| self.store.recorded_hash(id));

        let evicted = match key {
            Some(key) => self.store.release_document(id, &key).await,
            None => false,
        };
        debug!(document_id = id, indexed = removed.is_some(), evicted, "Document invalidated");
        removed.is_some() || evicted
    }

    /// Empties both the cache and the index.
    pub async fn clear_all(&self) {
        self.corpus.write().clear();
        self.store.clear().await;
    }

    /// Retries the provider for indexed documents whose vector is a fallback.
    ///
    /// Stops at the first provider failure. Returns how many were upgraded.
    #[instrument(skip(self))]
    pub async fn refresh_fallbacks(&self) -> usize {
        let pending: Vec<IndexedDocument> = self
            .corpus
            .read()
            .entries()
            .filter(|entry| {
                self.store
                    .get(&entry.document.content_hash())
                    .is_some_and(|cached| cached.meta.is_fallback())
            })
            .cloned()
            .collect();

        if pending.is_empty() {
            return 0;
        }

        let batch = self.store.begin_batch();
        let mut upgraded = 0;

        for entry in pending {
            let document = &entry.document;
            match self.embedder.try_provider(document.enriched_text()).await {
                Ok(vector) => {
                    let vector = self
                        .store
                        .insert(
                            document.content_hash(),
                            &Origin::document(document.id()),
                            Embedded::provided(vector),
                        )
                        .await;
                    self.corpus.write().insert(IndexedDocument {
                        document: Arc::clone(document),
                        vector,
                    });
                    upgraded += 1;
                }
                Err(err) => {
                    warn!(
                        document_id = document.id(),
                        error = %err,
                        "Provider still unavailable; keeping fallback vectors"
                    );
                    break;
                }
            }
        }

        if let Err(err) = batch.finish().await {
            warn!(error = %err, "Embedding cache not persisted after fallback refresh");
        }

        info!(upgraded, "Fallback refresh complete");
        upgraded
    }

    pub fn document_state(&self, document: &ExemplarDocument) -> DocumentState {
        let corpus = self.corpus.read();
        let Some(entry) = corpus.get(document.id()) else {
            return DocumentState::Unloaded;
        };

        let key = entry.document.content_hash();
        if key != document.content_hash() || !self.store.contains(&key) {
            DocumentState::Stale
        } else {
            DocumentState::Fresh
        }
    }

    pub fn document(&self, id: &str) -> Option<Arc<ExemplarDocument>> {
        self.corpus
            .read()
            .get(id)
            .map(|entry| Arc::clone(&entry.document))
    }

    /// Indexed ids in ascending order.
    pub fn document_ids(&self) -> Vec<String> {
        self.corpus.read().ids().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.corpus.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.read().is_empty()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            documents: self.len(),
            queries: self.queries.load(Ordering::Relaxed),
            provider_calls: self.embedder.provider_calls(),
            fallbacks: self.embedder.fallbacks(),
            cache: self.store.stats(),
        }
    }

    /// Persists any cache changes a failed write left behind.
    pub async fn flush(&self) -> CacheIoResult<()> {
        self.store.flush().await
    }
}
