use crate::checksum::{document_checksum, path_digest};
use crate::chunking::{chunk_text, ChunkingConfig};
use crate::config::IndexSettings;
use crate::models::{
    DocumentMetadata, ExtractedDocument, IndexFilter, IndexQuery, IndexRecord, RecordAttributes,
    UpsertOutcome, UNKNOWN_PATH,
};
use crate::traits::{DocumentIndex, IndexProvider};
use crate::IndexError;
use tracing::{debug, info, warn};

const FILE_PATH_FIELD: &str = "file_path";

/// Whether a record for `metadata.file_path` is already in the index.
///
/// Lookup failures count as "not indexed".
pub async fn document_exists<I>(index: &I, metadata: &DocumentMetadata) -> bool
where
    I: DocumentIndex + ?Sized,
{
    let Some(file_path) = metadata.file_path.as_deref() else {
        return false;
    };

    let query = IndexQuery {
        query: String::new(),
        top_k: 1,
        filters: vec![IndexFilter::equals(FILE_PATH_FIELD, file_path)],
    };

    match index.search(&query).await {
        Ok(response) => !response.details.is_empty(),
        Err(error) => {
            warn!(file_path, %error, "existence check failed, treating document as new");
            false
        }
    }
}

/// Builds one record per chunk. Ids are `<document id or path digest>_<position>`.
pub fn build_records(
    metadata: &DocumentMetadata,
    chunks: &[String],
    document_checksum: &str,
) -> Vec<IndexRecord> {
    let prefix = match (&metadata.id, &metadata.file_path) {
        (Some(id), _) => id.clone(),
        (None, Some(path)) => path_digest(path),
        (None, None) => path_digest(UNKNOWN_PATH),
    };

    chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| IndexRecord {
            id: format!("{prefix}_{position}"),
            value: chunk.clone(),
            attributes: RecordAttributes {
                document: metadata.clone(),
                chunk_index: position,
                total_chunks: chunks.len(),
                chunk_size: chunk.chars().count(),
                document_checksum: document_checksum.to_string(),
            },
        })
        .collect()
}

/// Validate, dedup, chunk, build records and submit them in a single call.
pub async fn upsert_document<I>(
    index: &I,
    document: ExtractedDocument,
    chunking: &ChunkingConfig,
) -> UpsertOutcome
where
    I: DocumentIndex + ?Sized,
{
    let ExtractedDocument { text, mut metadata } = document;

    if text.trim().is_empty() {
        return UpsertOutcome::Error {
            message: "Text content is required".to_string(),
            file_path: metadata.file_path,
        };
    }

    let file_size = *metadata.file_size.get_or_insert(text.chars().count() as u64);
    let file_path = metadata
        .file_path
        .get_or_insert_with(|| UNKNOWN_PATH.to_string())
        .clone();

    if document_exists(index, &metadata).await {
        debug!(file_path = %file_path, "document already indexed");
        return UpsertOutcome::Skipped {
            message: "Document already exists in the index. Skipping insertion.".to_string(),
            file_path,
        };
    }

    let chunks = match chunk_text(&text, chunking) {
        Ok(chunks) => chunks,
        Err(error) => {
            return UpsertOutcome::Error {
                message: format!("Error chunking document: {error}"),
                file_path: Some(file_path),
            }
        }
    };
    if chunks.is_empty() {
        return UpsertOutcome::Error {
            message: "Error chunking document: no chunks produced".to_string(),
            file_path: Some(file_path),
        };
    }

    let checksum = document_checksum(&text);
    let records = build_records(&metadata, &chunks, &checksum);

    match index.upsert(&records).await {
        Ok(()) => {
            info!(
                file_path = %file_path,
                index_id = index.id(),
                chunks = chunks.len(),
                "document indexed"
            );
            UpsertOutcome::Success {
                message: format!("Successfully added {} chunks to the index", chunks.len()),
                index_id: index.id().to_string(),
                total_chunks: chunks.len(),
                file_path,
                file_size,
            }
        }
        Err(error) => UpsertOutcome::Error {
            message: format!("Error inserting document: {error}"),
            file_path: Some(file_path),
        },
    }
}

/// Finds the index to write to: the configured id first, then a listed
/// index with the configured name, then a freshly created one.
pub async fn acquire_index<P>(provider: &P, settings: &IndexSettings) -> Result<P::Handle, IndexError>
where
    P: IndexProvider + ?Sized,
{
    if let Some(id) = settings.default_index_id.as_deref() {
        match provider.get(id).await {
            Ok(handle) => return Ok(handle),
            Err(error) => warn!(index_id = id, %error, "configured index unavailable"),
        }
    }

    match provider.list().await {
        Ok(indexes) => {
            if let Some(found) = indexes.iter().find(|info| info.name == settings.index_name) {
                match provider.get(&found.id).await {
                    Ok(handle) => return Ok(handle),
                    Err(error) => warn!(index_id = %found.id, %error, "listed index unavailable"),
                }
            }
        }
        Err(error) => warn!(%error, "could not list indexes"),
    }

    info!(name = %settings.index_name, "creating index");
    provider
        .create(
            &settings.index_name,
            &settings.description,
            settings.embedding_model.as_deref(),
        )
        .await
}
