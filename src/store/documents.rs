//! In-memory text of open documents

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tower_lsp::lsp_types::Url;
use tracing::debug;

/// Concurrency-safe map from document URI to its full current text.
///
/// Readers share the lock; every mutation takes it exclusively. Values are
/// cloned out, so nothing handed to a caller changes afterwards.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<Url, String>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the text stored for `uri`, if any
    pub fn get(&self, uri: &Url) -> Option<String> {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        documents.get(uri).cloned()
    }

    /// Replaces the whole text stored for `uri`
    pub fn set(&self, uri: Url, text: String) {
        debug!("Storing document {} ({} bytes)", uri, text.len());
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        documents.insert(uri, text);
    }

    pub fn delete(&self, uri: &Url) {
        debug!("Removing document {}", uri);
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        documents.remove(uri);
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        debug!("Clearing document store");
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Point-in-time copy of every stored text
    pub fn values(&self) -> Vec<String> {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        documents.values().cloned().collect()
    }
}
