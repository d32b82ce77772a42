use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing the persisted cache file.
///
/// Never fatal: a load failure starts the store empty, a write failure leaves
/// the in-memory mirror authoritative until the next successful flush.
#[derive(Error, Debug)]
pub enum CacheIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to move temp file into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("persist task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type CacheIoResult<T> = Result<T, CacheIoError>;
