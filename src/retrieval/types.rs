use serde::Serialize;

use crate::storage::StoreStats;

/// What an upsert had to do to make the document fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// The content hash was already cached; no embedding call.
    Cached,
    /// First embedding for this document.
    Generated,
    /// Content changed; the previous entry was invalidated and replaced.
    Regenerated,
}

/// Lifecycle of a document relative to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Not in the index.
    Unloaded,
    /// Indexed, but its content or cached vector no longer matches.
    Stale,
    /// Indexed with a vector for its current content.
    Fresh,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub cached: usize,
    pub generated: usize,
    pub regenerated: usize,
    /// Index entries dropped because their document vanished from the corpus.
    pub removed: usize,
}

impl SyncReport {
    pub(crate) fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Cached => self.cached += 1,
            UpsertOutcome::Generated => self.generated += 1,
            UpsertOutcome::Regenerated => self.regenerated += 1,
        }
    }

    /// Number of documents that needed an embedding computed.
    pub fn embedded(&self) -> usize {
        self.generated + self.regenerated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub documents: usize,
    pub queries: u64,
    pub provider_calls: u64,
    pub fallbacks: u64,
    pub cache: StoreStats,
}
