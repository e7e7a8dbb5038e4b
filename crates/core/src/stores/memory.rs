use crate::models::{FilterOperator, IndexFilter, IndexQuery, IndexRecord, SearchResponse};
use crate::traits::DocumentIndex;
use crate::IndexError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// Process-local index. Records are replaced by id, filters match attributes.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    id: String,
    records: Mutex<Vec<IndexRecord>>,
}

impl MemoryIndex {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<IndexRecord>>, IndexError> {
        self.records
            .lock()
            .map_err(|_| IndexError::Request("memory index lock poisoned".to_string()))
    }

    pub fn records(&self) -> Vec<IndexRecord> {
        self.guard().map(|records| records.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.guard().map(|records| records.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn filter_matches(attributes: &Value, filter: &IndexFilter) -> bool {
    match filter.operator {
        FilterOperator::Equals => attributes.get(&filter.field) == Some(&filter.value),
    }
}

#[async_trait]
impl DocumentIndex for MemoryIndex {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, query: &IndexQuery) -> Result<SearchResponse, IndexError> {
        let records = self.guard()?;
        let mut details = Vec::new();

        for record in records.iter() {
            if details.len() >= query.top_k {
                break;
            }
            let attributes = serde_json::to_value(&record.attributes)?;
            if query.filters.iter().all(|filter| filter_matches(&attributes, filter)) {
                details.push(serde_json::to_value(record)?);
            }
        }

        Ok(SearchResponse { details })
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError> {
        let mut stored = self.guard()?;
        for record in records {
            match stored.iter().position(|existing| existing.id == record.id) {
                Some(slot) => stored[slot] = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }
}
