use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;
use std::path::PathBuf;

pub const UNKNOWN_PATH: &str = "unknown_path";

/// How a document entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    Upload,
    DefaultContent,
}

/// A file as it arrives from the transport, before it touches the disk.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Document-level metadata. The processor fills every field; callers handing
/// text in directly may leave most of them empty.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub checksum: Option<String>,
    pub processing_date: Option<DateTime<Utc>>,
    pub source: Option<Provenance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl ExtractedDocument {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordAttributes {
    #[serde(flatten)]
    pub document: DocumentMetadata,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub chunk_size: usize,
    pub document_checksum: String,
}

/// One chunk as submitted to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub value: String,
    pub attributes: RecordAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    #[default]
    Equals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFilter {
    pub field: String,
    pub value: Value,
    pub operator: FilterOperator,
}

impl IndexFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: FilterOperator::Equals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuery {
    pub query: String,
    pub top_k: usize,
    pub filters: Vec<IndexFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub details: Vec<Value>,
}

/// Descriptor returned by index listing and creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
}

/// Result of one upsert call, serialized with a `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UpsertOutcome {
    Success {
        message: String,
        index_id: String,
        total_chunks: usize,
        file_path: String,
        file_size: u64,
    },
    Skipped {
        message: String,
        file_path: String,
    },
    Error {
        message: String,
        file_path: Option<String>,
    },
}

impl UpsertOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            UpsertOutcome::Success { .. } => "success",
            UpsertOutcome::Skipped { .. } => "skipped",
            UpsertOutcome::Error { .. } => "error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UpsertOutcome::Success { message, .. }
            | UpsertOutcome::Skipped { message, .. }
            | UpsertOutcome::Error { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UpsertOutcome::Success { .. })
    }
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct FileOutcome {
    pub path: PathBuf,
    pub outcome: UpsertOutcome,
}

/// Per-file results of a batch ingestion run.
#[derive(Default)]
pub struct IngestionReport {
    pub outcomes: Vec<FileOutcome>,
    pub skipped_files: Vec<SkippedFile>,
}

impl IngestionReport {
    pub fn count(&self, status: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|item| item.outcome.status() == status)
            .count()
    }
}
