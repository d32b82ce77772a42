use std::collections::BTreeMap;
use std::sync::Arc;

use crate::corpus::ExemplarDocument;
use crate::scoring::Candidate;

/// A document admitted to the index together with its fresh embedding.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub document: Arc<ExemplarDocument>,
    pub vector: Arc<[f32]>,
}

impl IndexedDocument {
    pub fn candidate(&self) -> Candidate<'_> {
        Candidate::new(&self.document, &self.vector)
    }
}

/// In-memory document index keyed by id, iterated in id order.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    documents: BTreeMap<String, IndexedDocument>,
}

impl Corpus {
    pub fn insert(&mut self, entry: IndexedDocument) -> Option<IndexedDocument> {
        self.documents
            .insert(entry.document.id().to_string(), entry)
    }

    pub fn remove(&mut self, id: &str) -> Option<IndexedDocument> {
        self.documents.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&IndexedDocument> {
        self.documents.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexedDocument> {
        self.documents.values()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
