//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `EXEMPLAR_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL, DEFAULT_MIN_CONTENT_CHARS,
    DEFAULT_PROVIDER_TIMEOUT_MS, DEFAULT_WORKERS,
};
use crate::corpus::CorpusConfig;
use crate::scoring::RankingConfig;

/// Runtime configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `EXEMPLAR_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Persisted cache file. Default: `./.data/embeddings_cache.json`.
    pub cache_path: PathBuf,

    /// Corpus source directories. Default: `./corpus`.
    pub corpus_dirs: Vec<PathBuf>,

    /// Embedding endpoint. `None` runs on fallback vectors only.
    pub provider_url: Option<String>,

    /// Model identifier sent with every embedding request.
    pub embedding_model: String,

    /// Per-call provider timeout. Default: 60 s.
    pub provider_timeout: Duration,

    /// Dimension of synthesized fallback vectors. Default: `384`.
    pub embedding_dim: usize,

    /// Concurrent embeddings during corpus sync. Default: `4`.
    pub workers: usize,

    /// Corpus sources with fewer trimmed characters are rejected. Default: `32`.
    pub min_content_chars: usize,

    /// Optional JSON file overriding the ranking table.
    pub ranking_config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("./.data/embeddings_cache.json"),
            corpus_dirs: vec![PathBuf::from("./corpus")],
            provider_url: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            workers: DEFAULT_WORKERS,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            ranking_config_path: None,
        }
    }
}

impl Config {
    const ENV_CACHE_PATH: &'static str = "EXEMPLAR_CACHE_PATH";
    const ENV_CORPUS_DIRS: &'static str = "EXEMPLAR_CORPUS_DIRS";
    const ENV_PROVIDER_URL: &'static str = "EXEMPLAR_PROVIDER_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "EXEMPLAR_EMBEDDING_MODEL";
    const ENV_PROVIDER_TIMEOUT_MS: &'static str = "EXEMPLAR_PROVIDER_TIMEOUT_MS";
    const ENV_EMBEDDING_DIM: &'static str = "EXEMPLAR_EMBEDDING_DIM";
    const ENV_WORKERS: &'static str = "EXEMPLAR_WORKERS";
    const ENV_MIN_CONTENT_CHARS: &'static str = "EXEMPLAR_MIN_CONTENT_CHARS";
    const ENV_RANKING_CONFIG: &'static str = "EXEMPLAR_RANKING_CONFIG";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_path = Self::parse_path_from_env(Self::ENV_CACHE_PATH, defaults.cache_path);
        let corpus_dirs =
            Self::parse_path_list_from_env(Self::ENV_CORPUS_DIRS, defaults.corpus_dirs);
        let provider_url = Self::parse_provider_url_from_env()?;
        let embedding_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_MODEL, defaults.embedding_model);
        let timeout_ms = Self::parse_positive_from_env(
            Self::ENV_PROVIDER_TIMEOUT_MS,
            DEFAULT_PROVIDER_TIMEOUT_MS,
        )?;
        let embedding_dim =
            Self::parse_positive_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim as u64)?;
        let workers = Self::parse_positive_from_env(Self::ENV_WORKERS, defaults.workers as u64)?;
        let min_content_chars = Self::parse_u64_from_env(
            Self::ENV_MIN_CONTENT_CHARS,
            defaults.min_content_chars as u64,
        )?;
        let ranking_config_path = Self::parse_optional_path_from_env(Self::ENV_RANKING_CONFIG);

        Ok(Self {
            cache_path,
            corpus_dirs,
            provider_url,
            embedding_model,
            provider_timeout: Duration::from_millis(timeout_ms),
            embedding_dim: embedding_dim as usize,
            workers: workers as usize,
            min_content_chars: min_content_chars as usize,
            ranking_config_path,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    ///
    /// Missing corpus directories are not an error here; the loader reports them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_path.is_dir() {
            return Err(ConfigError::NotAFile {
                path: self.cache_path.clone(),
            });
        }

        for dir in &self.corpus_dirs {
            if dir.exists() && !dir.is_dir() {
                return Err(ConfigError::NotADirectory { path: dir.clone() });
            }
        }

        if let Some(ref path) = self.ranking_config_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        for (name, value) in [
            (Self::ENV_EMBEDDING_DIM, self.embedding_dim),
            (Self::ENV_WORKERS, self.workers),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { name });
            }
        }

        Ok(())
    }

    /// The ranking table from `ranking_config_path`, or the built-in default.
    pub fn ranking_config(&self) -> Result<RankingConfig, ConfigError> {
        match self.ranking_config_path {
            Some(ref path) => Ok(RankingConfig::from_file(path)?),
            None => Ok(RankingConfig::default()),
        }
    }

    pub fn corpus_config(&self) -> CorpusConfig {
        CorpusConfig {
            min_content_chars: self.min_content_chars,
            ..CorpusConfig::default()
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_path_list_from_env(var_name: &str, default: Vec<PathBuf>) -> Vec<PathBuf> {
        match env::var_os(var_name) {
            Some(value) => {
                let paths: Vec<PathBuf> = env::split_paths(&value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect();
                if paths.is_empty() { default } else { paths }
            }
            None => default,
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_provider_url_from_env() -> Result<Option<String>, ConfigError> {
        let Some(value) = env::var(Self::ENV_PROVIDER_URL)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        else {
            return Ok(None);
        };

        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(Some(value))
        } else {
            Err(ConfigError::InvalidProviderUrl { value })
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_positive_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        let value = Self::parse_u64_from_env(var_name, default)?;
        if value == 0 {
            return Err(ConfigError::ZeroValue { name: var_name });
        }
        Ok(value)
    }
}
