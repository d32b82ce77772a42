//! Exemplar entrypoint: warm the embedding cache for the configured corpus and
//! optionally answer one query.
//!
//! ```text
//! exemplar [--refresh-fallbacks] [--top-k N] [--category NAME] [QUERY...]
//! ```

use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;

use exemplar::config::Config;
use exemplar::constants::DEFAULT_TOP_K;
use exemplar::corpus::CorpusLoader;
use exemplar::embedding::{
    EmbeddingProvider, HttpEmbeddingProvider, ResilientEmbedder, UnavailableProvider,
};
use exemplar::retrieval::RetrievalService;
use exemplar::scoring::SimilarityRanker;
use exemplar::storage::EmbeddingCacheStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Warm the embedding cache for the configured corpus and optionally rank one query.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Re-embed entries stored as fallback vectors once the provider is reachable
    #[arg(long)]
    refresh_fallbacks: bool,

    /// Maximum number of ranked results to print
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Category hint boosting documents of that category
    #[arg(long)]
    category: Option<String>,

    /// Query text; words are joined with single spaces
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    config.validate()?;
    let ranking = config.ranking_config()?;

    tracing::info!(
        cache_path = %config.cache_path.display(),
        corpus_dirs = config.corpus_dirs.len(),
        provider = config.provider_url.as_deref().unwrap_or("none"),
        "Exemplar starting"
    );

    let provider: Arc<dyn EmbeddingProvider> = match &config.provider_url {
        Some(url) => {
            let http = HttpEmbeddingProvider::new(url, &config.embedding_model);
            tracing::info!(
                endpoint = http.endpoint(),
                model = http.model(),
                "Using HTTP embedding provider"
            );
            Arc::new(http)
        }
        None => {
            tracing::warn!("No EXEMPLAR_PROVIDER_URL configured, using fallback vectors only");
            Arc::new(UnavailableProvider)
        }
    };
    let embedder = ResilientEmbedder::new(provider, config.provider_timeout, config.embedding_dim);

    let store = Arc::new(EmbeddingCacheStore::load(&config.cache_path));
    let service = RetrievalService::new(store, embedder, SimilarityRanker::new(ranking))
        .with_workers(config.workers);

    let loader = CorpusLoader::new(config.corpus_config());
    let documents = loader.load_all(&config.corpus_dirs);
    service.sync_corpus(documents).await;

    if args.refresh_fallbacks {
        service.refresh_fallbacks().await;
    }

    if !args.query.is_empty() {
        let text = args.query.join(" ");
        let results = service.query(&text, args.top_k, args.category.as_deref()).await;
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    if let Err(err) = service.flush().await {
        tracing::warn!(error = %err, "Embedding cache could not be flushed on exit");
    }

    let stats = service.stats();
    tracing::info!(
        documents = stats.documents,
        cache_entries = stats.cache.entries,
        provider_calls = stats.provider_calls,
        fallbacks = stats.fallbacks,
        "Exemplar finished"
    );

    Ok(())
}
