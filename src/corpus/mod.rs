//! Exemplar corpus loading.
//!
//! Source directories hold structured JSON records (one document each) and
//! freeform text files. A freeform file whose stem equals a record's id is bound
//! to that record as extended context; any other freeform file becomes its own
//! document. Sources that fail validation are skipped and reported, never fatal.

mod document;
mod enrich;
pub mod error;
mod loader;
mod record;


pub use document::{DocumentBody, ExemplarDocument};
pub use enrich::{EnrichmentLimits, truncate_chars};
pub use error::{CorpusLoadError, RecordError};
pub use loader::{CorpusConfig, CorpusLoader, DEFAULT_REJECT_MARKERS, LoadReport};
pub use record::flatten_record;
