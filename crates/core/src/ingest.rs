use crate::chunking::ChunkingConfig;
use crate::indexer::upsert_document;
use crate::models::{FileOutcome, IngestionReport, SkippedFile};
use crate::processor::DocumentProcessor;
use crate::traits::DocumentIndex;
use crate::IngestError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Every file under `folder` with an extension the processor accepts, sorted.
pub fn discover_supported_files(folder: &Path, processor: &DocumentProcessor) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if entry.file_type().is_file() && processor.is_supported_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Processes and upserts each file in turn. Files that cannot be processed
/// land in `skipped_files`; everything else has an upsert outcome.
pub async fn ingest_files<I>(
    processor: &DocumentProcessor,
    index: &I,
    paths: Vec<PathBuf>,
    chunking: &ChunkingConfig,
) -> IngestionReport
where
    I: DocumentIndex + ?Sized,
{
    let mut report = IngestionReport::default();

    for path in paths {
        let worker = processor.clone();
        let target = path.clone();
        let processed = tokio::task::spawn_blocking(move || worker.try_process_file(&target)).await;

        let document = match processed {
            Ok(Ok(document)) => document,
            Ok(Err(error)) => {
                warn!(path = %path.display(), %error, "skipped file");
                report.skipped_files.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
                continue;
            }
            Err(error) => {
                report.skipped_files.push(SkippedFile {
                    path,
                    reason: format!("extraction task failed: {error}"),
                });
                continue;
            }
        };

        let outcome = upsert_document(index, document, chunking).await;
        report.outcomes.push(FileOutcome { path, outcome });
    }

    report
}

pub async fn ingest_folder<I>(
    processor: &DocumentProcessor,
    index: &I,
    folder: &Path,
    chunking: &ChunkingConfig,
) -> Result<IngestionReport, IngestError>
where
    I: DocumentIndex + ?Sized,
{
    let files = discover_supported_files(folder, processor);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no supported files found in {}",
            folder.display()
        )));
    }

    Ok(ingest_files(processor, index, files, chunking).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryIndex;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_filters_extensions() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        fs::write(dir.path().join("b.md"), b"# b")?;
        fs::write(nested.join("a.PDF"), b"%PDF-1.4")?;
        fs::write(nested.join("skip.png"), b"png")?;

        let files = discover_supported_files(dir.path(), &DocumentProcessor::default());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|file| !file.ends_with("skip.png")));
        Ok(())
    }

    #[tokio::test]
    async fn ingestion_fails_without_supported_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("image.png"), b"png")?;

        let result = ingest_folder(
            &DocumentProcessor::default(),
            &MemoryIndex::new("mem"),
            dir.path(),
            &ChunkingConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[tokio::test]
    async fn folder_ingestion_reports_outcomes_and_skips() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("notes.txt"), b"Alpha. Beta. Gamma.")?;
        fs::write(dir.path().join("empty.md"), b"   ")?;
        fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4\n%broken")?;

        let processor = DocumentProcessor::default();
        let index = MemoryIndex::new("mem");
        let chunking = ChunkingConfig::default();

        let report = ingest_folder(&processor, &index, dir.path(), &chunking).await?;
        assert_eq!(report.count("success"), 1);
        assert_eq!(report.skipped_files.len(), 2);
        assert_eq!(index.len(), 1);

        let again = ingest_folder(&processor, &index, dir.path(), &chunking).await?;
        assert_eq!(again.count("skipped"), 1);
        assert_eq!(index.len(), 1);
        Ok(())
    }
}
