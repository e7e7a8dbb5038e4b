use crate::models::{IndexInfo, IndexQuery, IndexRecord, SearchResponse};
use crate::IndexError;
use async_trait::async_trait;

/// A handle on one semantic index. Implementations own persistence; this
/// crate only builds records and hands them over.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    fn id(&self) -> &str;

    async fn search(&self, query: &IndexQuery) -> Result<SearchResponse, IndexError>;

    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError>;
}

/// Index lookup and creation on the hosting service.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    type Handle: DocumentIndex;

    async fn get(&self, id: &str) -> Result<Self::Handle, IndexError>;

    async fn list(&self) -> Result<Vec<IndexInfo>, IndexError>;

    async fn create(
        &self,
        name: &str,
        description: &str,
        embedding_model: Option<&str>,
    ) -> Result<Self::Handle, IndexError>;
}
