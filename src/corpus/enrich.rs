//! Enriched-text construction.
//!
//! Every field is cut to a bounded length so documents from heterogeneous sources
//! produce embedding inputs of comparable size.

use std::collections::BTreeMap;

use crate::constants::{
    ENRICH_COMPANION_CHARS, ENRICH_FIELD_CHARS, ENRICH_FREEFORM_CHARS, ENRICH_MAX_RESOURCES,
    ENRICH_MAX_STAGES, ENRICH_MAX_TASKS_PER_STAGE, ENRICH_NOTES_CHARS,
};

/// Labelled fields in the order they appear in enriched text.
const LABELLED_FIELDS: [(&str, &str); 7] = [
    ("title", "TITLE"),
    ("objective", "OBJECTIVE"),
    ("level", "LEVEL"),
    ("duration", "DURATION"),
    ("category", "CATEGORY"),
    ("resources", "RESOURCES"),
    ("stages", "STAGES"),
];

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct EnrichmentLimits {
    pub field_chars: usize,
    pub notes_chars: usize,
    pub companion_chars: usize,
    pub freeform_chars: usize,
    pub max_resources: usize,
    pub max_stages: usize,
    pub max_tasks_per_stage: usize,
}

impl Default for EnrichmentLimits {
    fn default() -> Self {
        Self {
            field_chars: ENRICH_FIELD_CHARS,
            notes_chars: ENRICH_NOTES_CHARS,
            companion_chars: ENRICH_COMPANION_CHARS,
            freeform_chars: ENRICH_FREEFORM_CHARS,
            max_resources: ENRICH_MAX_RESOURCES,
            max_stages: ENRICH_MAX_STAGES,
            max_tasks_per_stage: ENRICH_MAX_TASKS_PER_STAGE,
        }
    }
}

/// Returns the longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub(crate) fn enrich_structured(
    fields: &BTreeMap<String, String>,
    companion: Option<&str>,
    limits: &EnrichmentLimits,
) -> String {
    let mut lines = Vec::with_capacity(LABELLED_FIELDS.len() + 2);

    for (key, label) in LABELLED_FIELDS {
        if let Some(value) = fields.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            lines.push(format!("{label}: {}", truncate_chars(value, limits.field_chars)));
        }
    }

    if let Some(notes) = fields.get("notes").map(|v| v.trim()).filter(|v| !v.is_empty()) {
        lines.push(format!("NOTES: {}", truncate_chars(notes, limits.notes_chars)));
    }

    if let Some(text) = companion.map(str::trim).filter(|t| !t.is_empty()) {
        lines.push(format!(
            "EXTENDED CONTEXT: {}",
            truncate_chars(text, limits.companion_chars)
        ));
    }

    lines.join("\n")
}

pub(crate) fn enrich_freeform(text: &str, limits: &EnrichmentLimits) -> String {
    truncate_chars(text.trim(), limits.freeform_chars).to_string()
}
