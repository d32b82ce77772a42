use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::document::{DocumentBody, ExemplarDocument};
use super::enrich::{EnrichmentLimits, enrich_freeform, enrich_structured, truncate_chars};
use super::error::CorpusLoadError;
use super::record::flatten_record;
use crate::constants::DEFAULT_MIN_CONTENT_CHARS;
use crate::hashing::{hash_byte_parts, hash_bytes};

/// Case-insensitive markers that identify test fixtures, error dumps and drafts.
pub const DEFAULT_REJECT_MARKERS: &[&str] = &[
    "test:",
    "[test]",
    "test document",
    "test file",
    "error:",
    "traceback",
    "exception:",
    "lorem ipsum",
    "placeholder",
    "todo:",
];

/// Characters of freeform text scanned for reject markers.
const MARKER_SCAN_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Minimum trimmed character count of a source's text.
    pub min_content_chars: usize,
    /// Lowercase markers; a match rejects the source.
    pub reject_markers: Vec<String>,
    pub limits: EnrichmentLimits,
    pub structured_extensions: Vec<String>,
    pub freeform_extensions: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            reject_markers: DEFAULT_REJECT_MARKERS.iter().map(|m| m.to_string()).collect(),
            limits: EnrichmentLimits::default(),
            structured_extensions: vec!["json".to_string()],
            freeform_extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

/// Outcome of a corpus scan.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Accepted documents, sorted by id.
    pub documents: Vec<ExemplarDocument>,
    /// Sources that were skipped, in scan order.
    pub skipped: Vec<CorpusLoadError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Structured,
    Freeform,
}

#[derive(Debug)]
struct Source {
    stem: String,
    path: PathBuf,
    kind: SourceKind,
}

/// Scans source directories into [`ExemplarDocument`]s.
#[derive(Debug, Clone, Default)]
pub struct CorpusLoader {
    config: CorpusConfig,
}

impl CorpusLoader {
    pub fn new(config: CorpusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    /// Loads every valid document under `dirs`; invalid sources are logged and skipped.
    pub fn load_all(&self, dirs: &[PathBuf]) -> Vec<ExemplarDocument> {
        self.load_all_with_report(dirs).documents
    }

    pub fn load_all_with_report(&self, dirs: &[PathBuf]) -> LoadReport {
        let mut report = LoadReport::default();
        let sources = self.scan(dirs, &mut report.skipped);

        // Freeform files sharing a record's stem are that record's companion.
        let record_stems: BTreeSet<&str> = sources
            .iter()
            .filter(|s| s.kind == SourceKind::Structured)
            .map(|s| s.stem.as_str())
            .collect();
        let mut companions: BTreeMap<&str, &Path> = BTreeMap::new();
        for source in sources.iter().filter(|s| s.kind == SourceKind::Freeform) {
            if record_stems.contains(source.stem.as_str()) {
                if companions.contains_key(source.stem.as_str()) {
                    report.skipped.push(CorpusLoadError::DuplicateId {
                        id: source.stem.clone(),
                        path: source.path.clone(),
                    });
                } else {
                    companions.insert(source.stem.as_str(), source.path.as_path());
                }
            }
        }

        let mut seen_ids = HashSet::new();
        for source in &sources {
            let result = match source.kind {
                SourceKind::Structured => {
                    let companion = companions.get(source.stem.as_str()).copied();
                    self.load_structured(source, companion)
                }
                SourceKind::Freeform if record_stems.contains(source.stem.as_str()) => continue,
                SourceKind::Freeform => self.load_freeform(source),
            };

            match result {
                Ok(document) if !seen_ids.insert(document.id().to_string()) => {
                    report.skipped.push(CorpusLoadError::DuplicateId {
                        id: document.id().to_string(),
                        path: source.path.clone(),
                    });
                }
                Ok(document) => {
                    debug!(
                        id = document.id(),
                        hash = %document.content_hash().short(),
                        companion = document.companion_ref().is_some(),
                        "Loaded corpus document"
                    );
                    report.documents.push(document);
                }
                Err(err) => report.skipped.push(err),
            }
        }

        for err in &report.skipped {
            warn!(path = %err.path().display(), error = %err, "Skipping corpus source");
        }

        report.documents.sort_by(|a, b| a.id().cmp(b.id()));
        info!(
            documents = report.documents.len(),
            skipped = report.skipped.len(),
            "Corpus loaded"
        );
        report
    }

    fn scan(&self, dirs: &[PathBuf], skipped: &mut Vec<CorpusLoadError>) -> Vec<Source> {
        let mut sources = Vec::new();

        for dir in dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(_) => {
                    skipped.push(CorpusLoadError::MissingSource { path: dir.clone() });
                    continue;
                }
            };

            let mut paths: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            paths.sort();

            for path in paths {
                let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
                    continue;
                };
                if stem.starts_with('.') || stem.is_empty() {
                    continue;
                }
                let Some(kind) = self.classify(&path) else {
                    debug!(path = %path.display(), "Ignoring unrecognised corpus file");
                    continue;
                };
                sources.push(Source {
                    stem: stem.to_string(),
                    path,
                    kind,
                });
            }
        }

        sources
    }

    fn classify(&self, path: &Path) -> Option<SourceKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if self.config.structured_extensions.iter().any(|e| *e == ext) {
            Some(SourceKind::Structured)
        } else if self.config.freeform_extensions.iter().any(|e| *e == ext) {
            Some(SourceKind::Freeform)
        } else {
            None
        }
    }

    fn load_structured(
        &self,
        source: &Source,
        companion: Option<&Path>,
    ) -> Result<ExemplarDocument, CorpusLoadError> {
        let path = &source.path;
        let raw = read(path)?;
        let text = std::str::from_utf8(&raw).map_err(|_| CorpusLoadError::Malformed {
            path: path.clone(),
            reason: "not valid UTF-8".to_string(),
        })?;
        self.check_length(path, text)?;

        let value: Value = serde_json::from_str(text).map_err(|e| CorpusLoadError::Malformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if value.get("error").is_some() {
            return Err(CorpusLoadError::NonProductionArtifact {
                path: path.clone(),
                marker: "error".to_string(),
            });
        }

        let fields = flatten_record(&value, &self.config.limits).map_err(|err| {
            CorpusLoadError::Malformed {
                path: path.clone(),
                reason: err.to_string(),
            }
        })?;

        let head = ["title", "objective"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        self.check_markers(path, &head)?;

        let companion = companion.and_then(|companion_path| match fs::read(companion_path) {
            Ok(bytes) => Some((companion_path, bytes)),
            Err(err) => {
                warn!(
                    path = %companion_path.display(),
                    error = %err,
                    "Companion text unreadable; loading record without it"
                );
                None
            }
        });

        let (content_hash, companion_text, companion_ref) = match &companion {
            Some((companion_path, bytes)) => (
                hash_byte_parts(&[raw.as_slice(), bytes.as_slice()]),
                Some(String::from_utf8_lossy(bytes)),
                Some(companion_path.display().to_string()),
            ),
            None => (hash_bytes(&raw), None, None),
        };

        let enriched = enrich_structured(&fields, companion_text.as_deref(), &self.config.limits);

        Ok(ExemplarDocument::assemble(
            source.stem.clone(),
            path.display().to_string(),
            DocumentBody::Structured(fields),
            companion_ref,
            enriched,
            content_hash,
        ))
    }

    fn load_freeform(&self, source: &Source) -> Result<ExemplarDocument, CorpusLoadError> {
        let path = &source.path;
        let raw = read(path)?;
        let text = String::from_utf8(raw.clone()).map_err(|_| CorpusLoadError::Malformed {
            path: path.clone(),
            reason: "not valid UTF-8".to_string(),
        })?;
        self.check_length(path, &text)?;
        self.check_markers(path, truncate_chars(text.trim_start(), MARKER_SCAN_CHARS))?;

        let enriched = enrich_freeform(&text, &self.config.limits);

        Ok(ExemplarDocument::assemble(
            source.stem.clone(),
            path.display().to_string(),
            DocumentBody::Freeform(text),
            None,
            enriched,
            hash_bytes(&raw),
        ))
    }

    fn check_length(&self, path: &Path, text: &str) -> Result<(), CorpusLoadError> {
        let chars = text.trim().chars().count();
        if chars < self.config.min_content_chars {
            return Err(CorpusLoadError::TooShort {
                path: path.to_path_buf(),
                chars,
                min: self.config.min_content_chars,
            });
        }
        Ok(())
    }

    fn check_markers(&self, path: &Path, text: &str) -> Result<(), CorpusLoadError> {
        let lowered = text.to_lowercase();
        match self
            .config
            .reject_markers
            .iter()
            .find(|marker| lowered.contains(marker.to_lowercase().as_str()))
        {
            Some(marker) => Err(CorpusLoadError::NonProductionArtifact {
                path: path.to_path_buf(),
                marker: marker.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, CorpusLoadError> {
    fs::read(path).map_err(|source| CorpusLoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}
