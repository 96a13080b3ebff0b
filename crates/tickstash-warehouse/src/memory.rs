//! Process-local document store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::document::{select_documents, Filter, SortSpec};
use crate::{DocumentStore, StoreError};

/// In-memory [`DocumentStore`]. Clones share the same collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<BTreeMap<String, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn read(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(select_documents(documents.iter().cloned(), filter, sort, limit))
    }

    fn upsert(&self, collection: &str, filter: &Filter, record: Value) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let documents = collections.entry(collection.to_owned()).or_default();

        match documents.iter_mut().find(|document| filter.matches(document)) {
            Some(existing) => *existing = record,
            None => documents.push(record),
        }
        Ok(true)
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collections.keys().cloned().collect())
    }
}
