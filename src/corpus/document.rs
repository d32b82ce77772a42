use std::collections::BTreeMap;

use serde::Serialize;

use super::enrich::{EnrichmentLimits, enrich_freeform, enrich_structured, truncate_chars};
use crate::hashing::{ContentHash, hash_bytes};

const TITLE_CHARS: usize = 120;

/// Parsed content of a document source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum DocumentBody {
    /// Canonical fields flattened from a JSON record.
    Structured(BTreeMap<String, String>),
    /// Plain text.
    Freeform(String),
}

/// One retrievable exemplar.
///
/// `content_hash` is derived from the raw source bytes (record plus bound
/// companion, if any); `enriched_text` is what gets embedded.
#[derive(Debug, Clone, Serialize)]
pub struct ExemplarDocument {
    id: String,
    source_ref: String,
    body: DocumentBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    companion_ref: Option<String>,
    enriched_text: String,
    content_hash: ContentHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(skip)]
    search_text: String,
}

impl ExemplarDocument {
    /// A freeform document keyed by the hash of `text`'s bytes.
    pub fn freeform(id: impl Into<String>, source_ref: impl Into<String>, text: &str) -> Self {
        let enriched = enrich_freeform(text, &EnrichmentLimits::default());
        Self::assemble(
            id.into(),
            source_ref.into(),
            DocumentBody::Freeform(text.to_string()),
            None,
            enriched,
            hash_bytes(text.as_bytes()),
        )
    }

    /// A structured document; `raw` is the record's source bytes.
    pub fn structured(
        id: impl Into<String>,
        source_ref: impl Into<String>,
        fields: BTreeMap<String, String>,
        raw: &[u8],
    ) -> Self {
        let enriched = enrich_structured(&fields, None, &EnrichmentLimits::default());
        Self::assemble(
            id.into(),
            source_ref.into(),
            DocumentBody::Structured(fields),
            None,
            enriched,
            hash_bytes(raw),
        )
    }

    pub(crate) fn assemble(
        id: String,
        source_ref: String,
        body: DocumentBody,
        companion_ref: Option<String>,
        enriched_text: String,
        content_hash: ContentHash,
    ) -> Self {
        let category = match &body {
            DocumentBody::Structured(fields) => fields
                .get("category")
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            DocumentBody::Freeform(_) => None,
        };
        let search_text = enriched_text.to_lowercase();

        Self {
            id,
            source_ref,
            body,
            companion_ref,
            enriched_text,
            content_hash,
            category,
            search_text,
        }
    }

    /// Overrides the category used for category-hint bonuses.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path (or other locator) of the primary source.
    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn body(&self) -> &DocumentBody {
        &self.body
    }

    pub fn companion_ref(&self) -> Option<&str> {
        self.companion_ref.as_deref()
    }

    pub fn enriched_text(&self) -> &str {
        &self.enriched_text
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Lowercased enriched text, used for term matching.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Display title: the record's title, the first non-empty line of
    /// freeform text, or the id.
    pub fn title(&self) -> &str {
        let title = match &self.body {
            DocumentBody::Structured(fields) => fields.get("title").map(|t| t.trim()),
            DocumentBody::Freeform(text) => text
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|line| truncate_chars(line, TITLE_CHARS)),
        };
        title.filter(|t| !t.is_empty()).unwrap_or(&self.id)
    }
}

impl PartialEq for ExemplarDocument {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.content_hash == other.content_hash
            && self.enriched_text == other.enriched_text
            && self.category == other.category
    }
}
