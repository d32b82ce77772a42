use std::sync::Arc;

use serde::Serialize;

use crate::corpus::ExemplarDocument;

/// Which pass admitted a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// Cosine similarity plus boost.
    Embedding,
    /// Keyword fallback; always scored below every embedding match.
    Keyword,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub document_id: String,
    /// Final score in `[0, 1]`.
    pub score: f32,
    pub source: MatchSource,
    pub title: String,
    #[serde(skip)]
    pub document: Arc<ExemplarDocument>,
}

impl RankedResult {
    pub fn new(document: Arc<ExemplarDocument>, score: f32, source: MatchSource) -> Self {
        Self {
            document_id: document.id().to_string(),
            score: score.clamp(0.0, 1.0),
            source,
            title: document.title().to_string(),
            document,
        }
    }
}

impl std::fmt::Display for RankedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:.3}, {:?}) {}",
            self.document_id, self.score, self.source, self.title
        )
    }
}
