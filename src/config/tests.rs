use super::*;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_exemplar_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("EXEMPLAR_CACHE_PATH");
        env::remove_var("EXEMPLAR_CORPUS_DIRS");
        env::remove_var("EXEMPLAR_PROVIDER_URL");
        env::remove_var("EXEMPLAR_EMBEDDING_MODEL");
        env::remove_var("EXEMPLAR_PROVIDER_TIMEOUT_MS");
        env::remove_var("EXEMPLAR_EMBEDDING_DIM");
        env::remove_var("EXEMPLAR_WORKERS");
        env::remove_var("EXEMPLAR_MIN_CONTENT_CHARS");
        env::remove_var("EXEMPLAR_RANKING_CONFIG");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(
        config.cache_path,
        PathBuf::from("./.data/embeddings_cache.json")
    );
    assert_eq!(config.corpus_dirs, vec![PathBuf::from("./corpus")]);
    assert!(config.provider_url.is_none());
    assert_eq!(config.embedding_model, "nomic-embed-text");
    assert_eq!(config.provider_timeout, Duration::from_secs(60));
    assert_eq!(config.embedding_dim, 384);
    assert_eq!(config.workers, 4);
    assert_eq!(config.min_content_chars, 32);
    assert!(config.ranking_config_path.is_none());
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_exemplar_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_from_env_full_config_parse() {
    clear_exemplar_env();

    let dirs = env::join_paths(["/srv/corpus/records", "/srv/corpus/notes"]).unwrap();
    let dirs = dirs.to_str().unwrap().to_string();

    with_env_vars(
        &[
            ("EXEMPLAR_CACHE_PATH", "/var/cache/exemplar.json"),
            ("EXEMPLAR_CORPUS_DIRS", dirs.as_str()),
            ("EXEMPLAR_PROVIDER_URL", "http://localhost:11434/api/embeddings"),
            ("EXEMPLAR_EMBEDDING_MODEL", "all-minilm"),
            ("EXEMPLAR_PROVIDER_TIMEOUT_MS", "2500"),
            ("EXEMPLAR_EMBEDDING_DIM", "768"),
            ("EXEMPLAR_WORKERS", "8"),
            ("EXEMPLAR_MIN_CONTENT_CHARS", "0"),
            ("EXEMPLAR_RANKING_CONFIG", "/etc/exemplar/ranking.json"),
        ],
        || {
            let config = Config::from_env().expect("should parse");

            assert_eq!(config.cache_path, PathBuf::from("/var/cache/exemplar.json"));
            assert_eq!(
                config.corpus_dirs,
                vec![
                    PathBuf::from("/srv/corpus/records"),
                    PathBuf::from("/srv/corpus/notes")
                ]
            );
            assert_eq!(
                config.provider_url.as_deref(),
                Some("http://localhost:11434/api/embeddings")
            );
            assert_eq!(config.embedding_model, "all-minilm");
            assert_eq!(config.provider_timeout, Duration::from_millis(2500));
            assert_eq!(config.embedding_dim, 768);
            assert_eq!(config.workers, 8);
            assert_eq!(config.min_content_chars, 0);
            assert_eq!(
                config.ranking_config_path,
                Some(PathBuf::from("/etc/exemplar/ranking.json"))
            );
        },
    );
}

#[test]
#[serial]
fn test_blank_values_fall_back_to_defaults() {
    clear_exemplar_env();

    with_env_vars(
        &[
            ("EXEMPLAR_PROVIDER_URL", "   "),
            ("EXEMPLAR_EMBEDDING_MODEL", ""),
            ("EXEMPLAR_RANKING_CONFIG", " "),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert!(config.provider_url.is_none());
            assert_eq!(config.embedding_model, "nomic-embed-text");
            assert!(config.ranking_config_path.is_none());
        },
    );
}

#[test]
#[serial]
fn test_invalid_number() {
    clear_exemplar_env();

    with_env_vars(&[("EXEMPLAR_EMBEDDING_DIM", "wide")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                name: "EXEMPLAR_EMBEDDING_DIM",
                ..
            }
        ));
        assert!(err.to_string().contains("wide"));
    });
}

#[test]
#[serial]
fn test_zero_workers_rejected() {
    clear_exemplar_env();

    with_env_vars(&[("EXEMPLAR_WORKERS", "0")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroValue { name: "EXEMPLAR_WORKERS" }));
    });
}

#[test]
#[serial]
fn test_zero_timeout_rejected() {
    clear_exemplar_env();

    with_env_vars(&[("EXEMPLAR_PROVIDER_TIMEOUT_MS", "0")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::ZeroValue { .. })
        ));
    });
}

#[test]
#[serial]
fn test_invalid_provider_url() {
    clear_exemplar_env();

    with_env_vars(&[("EXEMPLAR_PROVIDER_URL", "localhost:11434")], || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProviderUrl { .. }));
        assert!(err.to_string().contains("localhost:11434"));
    });
}

#[test]
fn test_validate_success_with_defaults() {
    let config = Config::default();

    // Neither the cache file nor the corpus directory exists yet.
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_success_with_valid_paths() {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let dir = tempfile::tempdir().unwrap();
    let ranking = dir.path().join("ranking.json");
    std::fs::write(&ranking, "{}").unwrap();

    let config = Config {
        cache_path: dir.path().join("cache.json"),
        corpus_dirs: vec![manifest_dir.join("src")],
        ranking_config_path: Some(ranking),
        ..Default::default()
    };

    assert!(config.validate().is_ok());
    assert_eq!(config.ranking_config().unwrap(), RankingConfig::default());
}

#[test]
fn test_validate_cache_path_is_directory() {
    let config = Config {
        cache_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotAFile { .. })
    ));
}

#[test]
fn test_validate_corpus_dir_is_file() {
    let config = Config {
        corpus_dirs: vec![PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml")],
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory { .. })
    ));
}

#[test]
fn test_validate_nonexistent_ranking_config() {
    let config = Config {
        ranking_config_path: Some(PathBuf::from("/nonexistent/ranking.json")),
        ..Default::default()
    };

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::PathNotFound { .. }));
    assert!(err.to_string().contains("/nonexistent/ranking.json"));
}

#[test]
fn test_ranking_config_errors_are_wrapped() {
    let dir = tempfile::tempdir().unwrap();
    let ranking = dir.path().join("ranking.json");
    std::fs::write(&ranking, r#"{"boost_ceiling": 4.0}"#).unwrap();

    let config = Config {
        ranking_config_path: Some(ranking),
        ..Default::default()
    };

    assert!(matches!(
        config.ranking_config(),
        Err(ConfigError::Ranking(_))
    ));
}

#[test]
fn test_corpus_config_uses_min_content_chars() {
    let config = Config {
        min_content_chars: 5,
        ..Default::default()
    };

    let corpus = config.corpus_config();
    assert_eq!(corpus.min_content_chars, 5);
    assert!(!corpus.reject_markers.is_empty());
}
