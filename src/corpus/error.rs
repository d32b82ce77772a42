use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a JSON value cannot be read as a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected a JSON object at the top level")]
    NotAnObject,

    #[error("record has no textual fields")]
    NoTextualFields,
}

/// Why a single source was skipped. The rest of the batch still loads.
#[derive(Debug, Error)]
pub enum CorpusLoadError {
    #[error("corpus source is not a readable directory: {path}")]
    MissingSource { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("{path} has {chars} characters of content, below the minimum of {min}")]
    TooShort {
        path: PathBuf,
        chars: usize,
        min: usize,
    },

    #[error("{path} looks like a non-production artifact (marker '{marker}')")]
    NonProductionArtifact { path: PathBuf, marker: String },

    #[error("duplicate document id '{id}' at {path}")]
    DuplicateId { id: String, path: PathBuf },
}

impl CorpusLoadError {
    /// The offending source path.
    pub fn path(&self) -> &Path {
        match self {
            CorpusLoadError::MissingSource { path }
            | CorpusLoadError::Unreadable { path, .. }
            | CorpusLoadError::Malformed { path, .. }
            | CorpusLoadError::TooShort { path, .. }
            | CorpusLoadError::NonProductionArtifact { path, .. }
            | CorpusLoadError::DuplicateId { path, .. } => path,
        }
    }
}
