//! Test fixtures for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use exemplar::corpus::{CorpusLoader, ExemplarDocument};
use exemplar::embedding::{MockEmbeddingProvider, ResilientEmbedder};
use exemplar::retrieval::{RetrievalService, SyncReport};
use exemplar::scoring::SimilarityRanker;
use exemplar::storage::EmbeddingCacheStore;
use tempfile::TempDir;

pub const DIM: usize = exemplar::constants::DEFAULT_EMBEDDING_DIM;

pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(2);

pub const MARKET_FAIR_JSON: &str = r#"{
  "title": "Market Fair",
  "objective": "Students run a classroom market and practise pricing with fractions",
  "subject": "mathematics",
  "resources": ["coins", "price tags", "baskets"],
  "stages": [
    {"name": "Setup", "tasks": [
      {"description": "build the stalls"},
      {"description": "label prices"}
    ]},
    {"name": "Trading", "tasks": ["buy and sell goods"]}
  ]
}"#;

pub const MARKET_FAIR_TXT: &str =
    "Rotate the cashier role so every student handles change at least once.";

pub const CELLS_JSON: &str = r#"{
  "title": "Cell Explorers",
  "objective": "Observe plant and animal cells under the microscope and compare them",
  "subject": "science"
}"#;

pub const PIRATES_TXT: &str =
    "Pirate treasure hunt across the island, with a riddle to solve at every stop.";

/// The four-document corpus used by the ranking scenario.
pub fn scenario_documents() -> Vec<ExemplarDocument> {
    [
        ("A", "fraction pricing market simulation with cashier roles"),
        ("B", "cell biology laboratory observation"),
        ("C", "pirate treasure island adventure"),
        ("D", "market fair riddles and pricing games"),
    ]
    .into_iter()
    .map(|(id, text)| ExemplarDocument::freeform(id, format!("scenario://{id}"), text))
    .collect()
}

/// A temporary corpus directory plus a cache file location beside it.
pub struct CorpusFixture {
    dir: TempDir,
}

impl CorpusFixture {
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        };
        std::fs::create_dir_all(fixture.corpus_dir()).expect("create corpus dir");
        fixture
    }

    /// A corpus with two records (one with a companion) and one freeform file.
    pub fn standard() -> Self {
        let fixture = Self::new();
        fixture.write("market_fair.json", MARKET_FAIR_JSON);
        fixture.write("market_fair.txt", MARKET_FAIR_TXT);
        fixture.write("cells.json", CELLS_JSON);
        fixture.write("pirates.txt", PIRATES_TXT);
        fixture
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.dir.path().join("corpus")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.path().join("cache").join("embeddings_cache.json")
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.corpus_dir().join(name);
        std::fs::write(&path, contents).expect("write corpus file");
        path
    }

    pub fn load(&self) -> Vec<ExemplarDocument> {
        CorpusLoader::default().load_all(&[self.corpus_dir()])
    }

    pub fn read_cache_json(&self) -> serde_json::Value {
        let bytes = std::fs::read(self.cache_path()).expect("read cache file");
        serde_json::from_slice(&bytes).expect("cache file is JSON")
    }
}

pub fn service(
    provider: &MockEmbeddingProvider,
    store: Arc<EmbeddingCacheStore>,
) -> RetrievalService {
    let embedder = ResilientEmbedder::new(Arc::new(provider.clone()), PROVIDER_TIMEOUT, DIM);
    RetrievalService::new(store, embedder, SimilarityRanker::default())
}

/// One process run: load the cache from `cache_path`, sync `fixture`'s corpus.
pub async fn run_once(
    provider: &MockEmbeddingProvider,
    cache_path: &Path,
    fixture: &CorpusFixture,
) -> (RetrievalService, SyncReport) {
    let store = Arc::new(EmbeddingCacheStore::load(cache_path));
    let service = service(provider, store);
    let report = service.sync_corpus(fixture.load()).await;
    (service, report)
}
