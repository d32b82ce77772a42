use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use super::*;
use crate::embedding::{Embedded, fallback_vector};
use crate::hashing::{hash_bytes, hash_text};

fn cache_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("cache").join("embeddings_cache.json")
}

fn provided(values: &[f32]) -> Embedded {
    Embedded::provided(values.to_vec())
}

#[tokio::test]
async fn test_get_or_compute_computes_once() {
    let store = EmbeddingCacheStore::in_memory();
    let key = hash_text("market pricing");
    let computed = AtomicUsize::new(0);

    for _ in 0..3 {
        let vector = store
            .get_or_compute(key, Origin::query("market pricing"), || async {
                computed.fetch_add(1, Ordering::SeqCst);
                provided(&[0.6, 0.8])
            })
            .await;
        assert_eq!(&*vector, &[0.6, 0.8]);
    }

    assert_eq!(computed.load(Ordering::SeqCst), 1);
    let stats = store.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_persist_and_reload_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let doc_key = hash_bytes(b"{\"title\": \"Market fair\"}");
    let query_key = hash_text("riddles");

    {
        let store = EmbeddingCacheStore::load(&path);
        assert!(store.is_empty());
        store.insert(doc_key, &Origin::document("market_fair"), provided(&[1.0, 0.0])).await;
        store
            .insert(
                query_key,
                &Origin::query("riddles"),
                Embedded::fallback(fallback_vector("riddles", 4)),
            )
            .await;
    }

    let reloaded = EmbeddingCacheStore::load(&path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.recorded_hash("market_fair"), Some(doc_key));

    let doc = reloaded.get(&doc_key).unwrap();
    assert_eq!(&*doc.vector, &[1.0, 0.0]);
    assert_eq!(doc.meta.kind, EntryKind::Document);

    let query = reloaded.get(&query_key).unwrap();
    assert!(query.meta.is_fallback());
    assert_eq!(query.meta.origin, OriginType::Query);
    assert_eq!(&*query.vector, fallback_vector("riddles", 4).as_slice());
}

#[tokio::test]
async fn test_persisted_layout_has_two_top_level_maps() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let key = hash_bytes(b"pirate treasure island adventure");

    let store = EmbeddingCacheStore::load(&path);
    store.insert(key, &Origin::document("pirates"), provided(&[0.0, 1.0])).await;

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let hex = key.to_hex();

    assert_eq!(json["embeddings"][&hex], serde_json::json!([0.0, 1.0]));
    assert_eq!(json["metadata"][&hex]["source"], "pirates");
    assert_eq!(json["metadata"][&hex]["type"], "document");
    assert_eq!(json["metadata"][&hex]["origin"], "document");
    assert!(json["metadata"][&hex]["generated_at"].is_string());
}

#[tokio::test]
async fn test_corrupt_file_starts_empty_and_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{\"embeddings\": {\"abc\": [1.0,").unwrap();

    let store = EmbeddingCacheStore::load(&path);
    assert!(store.is_empty());

    let key = hash_text("recovery");
    store.insert(key, &Origin::query("recovery"), provided(&[1.0])).await;

    let reloaded = EmbeddingCacheStore::load(&path);
    assert!(reloaded.contains(&key));
}

#[test]
fn test_missing_file_starts_empty_without_creating_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);

    let store = EmbeddingCacheStore::load(&path);

    assert!(store.is_empty());
    assert!(!path.exists());
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn test_invalidate_removes_entry_and_document_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let key = hash_bytes(b"cell biology laboratory observation");

    let store = EmbeddingCacheStore::load(&path);
    store.insert(key, &Origin::document("cells"), provided(&[0.5, 0.5])).await;
    assert_eq!(store.recorded_hash("cells"), Some(key));

    assert!(store.invalidate(&key).await);
    assert!(!store.invalidate(&key).await);
    assert!(store.recorded_hash("cells").is_none());

    let reloaded = EmbeddingCacheStore::load(&path);
    assert!(!reloaded.contains(&key));
}

#[tokio::test]
async fn test_clear_removes_everything() {
    let store = EmbeddingCacheStore::in_memory();
    store.insert(hash_text("a"), &Origin::query("a"), provided(&[1.0])).await;
    store.insert(hash_bytes(b"b"), &Origin::document("b"), provided(&[1.0])).await;

    store.clear().await;

    assert!(store.is_empty());
    assert!(store.recorded_hash("b").is_none());
}

#[tokio::test]
async fn test_upsert_keeps_single_entry_per_key() {
    let store = EmbeddingCacheStore::in_memory();
    let key = hash_text("same text");

    store.insert(key, &Origin::query("same text"), Embedded::fallback(vec![1.0, 0.0])).await;
    store.insert(key, &Origin::query("same text"), provided(&[0.0, 1.0])).await;

    assert_eq!(store.len(), 1);
    let entry = store.get(&key).unwrap();
    assert_eq!(&*entry.vector, &[0.0, 1.0]);
    assert!(!entry.meta.is_fallback());
}

#[tokio::test]
async fn test_new_document_key_replaces_recorded_hash() {
    let store = EmbeddingCacheStore::in_memory();
    let old = hash_bytes(b"version one of the market fair record");
    let new = hash_bytes(b"version two of the market fair record");

    store.insert(old, &Origin::document("market_fair"), provided(&[1.0])).await;
    store.insert(new, &Origin::document("market_fair"), provided(&[0.5])).await;
    assert_eq!(store.recorded_hash("market_fair"), Some(new));

    // Dropping the superseded key must not forget the live one.
    store.invalidate(&old).await;
    assert_eq!(store.recorded_hash("market_fair"), Some(new));
}

#[tokio::test]
async fn test_write_failure_keeps_memory_authoritative() {
    let dir = tempfile::tempdir().unwrap();
    // The parent "directory" is a regular file, so every flush fails.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let path = blocker.join("embeddings_cache.json");

    let store = EmbeddingCacheStore::load(&path);
    let key = hash_text("unwritable");
    store.insert(key, &Origin::query("unwritable"), provided(&[1.0])).await;

    assert!(store.contains(&key));
    assert!(store.is_dirty());
    assert_eq!(store.stats().write_failures, 1);
    assert!(store.flush().await.is_err());
    assert_eq!(store.stats().write_failures, 2);
}

#[tokio::test]
async fn test_flush_recovers_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let blocked_dir = dir.path().join("later");
    std::fs::write(&blocked_dir, b"temporarily a file").unwrap();
    let path = blocked_dir.join("embeddings_cache.json");

    let store = EmbeddingCacheStore::load(&path);
    let key = hash_text("retry me");
    store.insert(key, &Origin::query("retry me"), provided(&[1.0])).await;
    assert!(store.is_dirty());

    std::fs::remove_file(&blocked_dir).unwrap();
    store.flush().await.unwrap();

    assert!(!store.is_dirty());
    assert!(EmbeddingCacheStore::load(&path).contains(&key));
}

#[tokio::test]
async fn test_batch_defers_persistence_until_outermost_guard() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let store = EmbeddingCacheStore::load(&path);

    let outer = store.begin_batch();
    let inner = store.begin_batch();
    store.insert(hash_text("one"), &Origin::query("one"), provided(&[1.0])).await;
    inner.finish().await.unwrap();
    store.insert(hash_text("two"), &Origin::query("two"), provided(&[1.0])).await;
    assert!(!path.exists());
    assert!(store.is_dirty());

    outer.finish().await.unwrap();

    assert!(path.exists());
    assert!(!store.is_dirty());
    assert_eq!(EmbeddingCacheStore::load(&path).len(), 2);
}

#[tokio::test]
async fn test_dropped_batch_leaves_changes_for_next_flush() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let store = EmbeddingCacheStore::load(&path);

    {
        let _abandoned = store.begin_batch();
        store.insert(hash_text("pending"), &Origin::query("pending"), provided(&[1.0])).await;
    }
    assert!(!path.exists());
    assert!(store.is_dirty());

    store.flush().await.unwrap();
    assert!(!store.is_dirty());
    assert_eq!(EmbeddingCacheStore::load(&path).len(), 1);
}

#[tokio::test]
async fn test_batch_finish_reports_flush_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let store = EmbeddingCacheStore::load(&path);

    let batch = store.begin_batch();
    store.insert(hash_text("batched"), &Origin::query("batched"), provided(&[1.0])).await;
    batch.finish().await.unwrap();

    assert!(path.exists());
}

#[tokio::test]
async fn test_concurrent_writers_produce_consistent_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let store = Arc::new(EmbeddingCacheStore::load(&path));

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let text = format!("query number {i}");
            store
                .get_or_compute(hash_text(&text), Origin::query(&text), || async move {
                    provided(&[i as f32, 1.0])
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.len(), 16);
    assert_eq!(EmbeddingCacheStore::load(&path).len(), 16);
}

#[tokio::test]
async fn test_shared_key_survives_until_last_holder_releases() {
    let dir = tempfile::tempdir().unwrap();
    let path = cache_path(&dir);
    let key = hash_bytes(b"{\"title\": \"Lighthouse keeper\"}");

    let store = EmbeddingCacheStore::load(&path);
    store.insert(key, &Origin::document("north_light"), provided(&[1.0, 0.0])).await;
    store.link_document("south_light", key);
    assert_eq!(store.holders(&key), vec!["north_light", "south_light"]);
    assert_eq!(store.recorded_hash("south_light"), Some(key));

    assert!(!store.release_document("north_light", &key).await);
    assert!(store.contains(&key));
    assert!(store.recorded_hash("north_light").is_none());
    assert_eq!(store.holders(&key), vec!["south_light"]);

    assert!(store.release_document("south_light", &key).await);
    assert!(!store.contains(&key));
    assert!(store.holders(&key).is_empty());
    assert!(!EmbeddingCacheStore::load(&path).contains(&key));
}

#[tokio::test]
async fn test_document_hit_records_holder() {
    let store = EmbeddingCacheStore::in_memory();
    let key = hash_bytes(b"identical chapter text");
    store.insert(key, &Origin::document("chapter_one"), provided(&[0.3])).await;

    let vector = store
        .get_or_compute(key, Origin::document("chapter_one_copy"), || async {
            provided(&[9.9])
        })
        .await;

    assert_eq!(&*vector, &[0.3]);
    assert_eq!(store.stats().misses, 0);
    assert_eq!(store.holders(&key), vec!["chapter_one", "chapter_one_copy"]);
}

#[test]
fn test_link_document_ignores_uncached_key() {
    let store = EmbeddingCacheStore::in_memory();
    let key = hash_bytes(b"never embedded");

    store.link_document("ghost", key);

    assert!(store.recorded_hash("ghost").is_none());
    assert!(store.holders(&key).is_empty());
}

#[test]
fn test_query_origin_truncates_long_text() {
    let text = "x".repeat(500);
    let origin = Origin::query(&text);
    assert_eq!(origin.id.chars().count(), 80);
    assert_eq!(origin.kind, OriginType::Query);
}
