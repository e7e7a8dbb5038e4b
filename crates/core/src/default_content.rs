use crate::chunking::ChunkingConfig;
use crate::indexer::{document_exists, upsert_document};
use crate::models::{DocumentMetadata, Provenance, UpsertOutcome};
use crate::processor::DocumentProcessor;
use crate::traits::DocumentIndex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultContentStatus {
    AlreadyIndexed,
    Indexed { chunks: usize },
    Missing,
    Failed(String),
}

/// Seeds the index with the first PDF found in a default-content directory.
#[derive(Debug, Clone)]
pub struct DefaultContentLoader {
    dir: PathBuf,
    processor: DocumentProcessor,
}

impl DefaultContentLoader {
    pub fn new(dir: impl Into<PathBuf>, processor: DocumentProcessor) -> Self {
        Self {
            dir: dir.into(),
            processor,
        }
    }

    /// First `.pdf` in the directory by name, if any.
    pub fn default_pdf_path(&self) -> Option<PathBuf> {
        let mut pdfs = fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|extension| extension.to_str())
                        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
            })
            .collect::<Vec<_>>();
        pdfs.sort_unstable();
        pdfs.into_iter().next()
    }

    pub async fn load<I>(&self, index: &I, chunking: &ChunkingConfig) -> DefaultContentStatus
    where
        I: DocumentIndex + ?Sized,
    {
        let Some(pdf_path) = self.default_pdf_path() else {
            error!(dir = %self.dir.display(), "default PDF file not found");
            return DefaultContentStatus::Missing;
        };

        match self.load_path(&pdf_path, index, chunking).await {
            DefaultContentStatus::Failed(reason) => {
                error!(path = %pdf_path.display(), %reason, "failed to load default content");
                DefaultContentStatus::Failed(reason)
            }
            status => status,
        }
    }

    async fn load_path<I>(&self, pdf_path: &Path, index: &I, chunking: &ChunkingConfig) -> DefaultContentStatus
    where
        I: DocumentIndex + ?Sized,
    {
        let limit = self.processor.config().max_file_size_bytes;
        match fs::metadata(pdf_path) {
            Ok(stat) if stat.len() > limit => {
                return DefaultContentStatus::Failed(format!(
                    "PDF file too large: {} bytes (limit {limit})",
                    stat.len()
                ));
            }
            Ok(_) => {}
            Err(error) => {
                return DefaultContentStatus::Failed(format!("PDF file not accessible: {error}"));
            }
        }

        let absolute = match std::path::absolute(pdf_path) {
            Ok(path) => path.to_string_lossy().to_string(),
            Err(error) => return DefaultContentStatus::Failed(error.to_string()),
        };
        let probe = DocumentMetadata {
            file_path: Some(absolute),
            ..Default::default()
        };
        if document_exists(index, &probe).await {
            info!("default content already indexed");
            return DefaultContentStatus::AlreadyIndexed;
        }

        let Some(mut document) = self.processor.process_file(pdf_path) else {
            return DefaultContentStatus::Failed("failed to process default PDF".to_string());
        };
        document.metadata.source = Some(Provenance::DefaultContent);

        match upsert_document(index, document, chunking).await {
            UpsertOutcome::Success { total_chunks, .. } => {
                info!(chunks = total_chunks, "loaded default content");
                DefaultContentStatus::Indexed {
                    chunks: total_chunks,
                }
            }
            UpsertOutcome::Skipped { .. } => DefaultContentStatus::AlreadyIndexed,
            UpsertOutcome::Error { message, .. } => DefaultContentStatus::Failed(message),
        }
    }
}
