//! The façade that turns a file on disk into an [`ExtractedDocument`].

use crate::checksum::checksum_bytes;
use crate::config::ProcessorConfig;
use crate::error::IngestError;
use crate::extractor::{extract_text, normalize_extension, FileFamily};
use crate::models::{DocumentMetadata, ExtractedDocument, RawDocument};
use crate::pdf::PdfFallbackChain;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    config: ProcessorConfig,
    pdf: PdfFallbackChain,
}

impl DocumentProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            pdf: PdfFallbackChain::default(),
        }
    }

    pub fn with_pdf_chain(mut self, pdf: PdfFallbackChain) -> Self {
        self.pdf = pdf;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn is_supported_file(&self, path: &Path) -> bool {
        file_extension(path).is_some_and(|extension| self.config.family_of(&extension).is_some())
    }

    /// Extracts text and metadata, or returns `None` after logging why not.
    pub fn process_file(&self, path: &Path) -> Option<ExtractedDocument> {
        match self.try_process_file(path) {
            Ok(document) => Some(document),
            Err(error) => {
                warn!(path = %path.display(), %error, "document processing failed");
                None
            }
        }
    }

    pub fn try_process_file(&self, path: &Path) -> Result<ExtractedDocument, IngestError> {
        let extension = file_extension(path)
            .ok_or_else(|| IngestError::UnsupportedFormat(path.display().to_string()))?;
        let family = self
            .config
            .family_of(&extension)
            .ok_or_else(|| IngestError::UnsupportedFormat(extension.clone()))?;

        let stat = fs::metadata(path)?;
        if stat.len() > self.config.max_file_size_bytes {
            return Err(IngestError::SizeLimitExceeded {
                size: stat.len(),
                limit: self.config.max_file_size_bytes,
            });
        }

        let bytes = fs::read(path)?;
        let text = extract_text(&bytes, family, &extension, &self.pdf);
        if text.is_empty() {
            let shown = path.display().to_string();
            return Err(match family {
                FileFamily::Text => IngestError::EmptyContent(shown),
                FileFamily::Pdf | FileFamily::Office => IngestError::ExtractionFailure(shown),
            });
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

        let metadata = DocumentMetadata {
            file_path: Some(std::path::absolute(path)?.to_string_lossy().to_string()),
            file_name: Some(file_name.to_string()),
            file_type: Some(extension),
            file_size: Some(stat.len()),
            last_modified: stat.modified().ok().map(DateTime::<Utc>::from),
            checksum: Some(checksum_bytes(&bytes)),
            processing_date: Some(Utc::now()),
            source: Some(self.config.provenance),
            ..Default::default()
        };

        debug!(path = %path.display(), chars = text.len(), "document extracted");
        Ok(ExtractedDocument::new(text, metadata))
    }

    /// Processes each path, keeping only the documents that succeeded.
    pub fn batch_process(&self, paths: &[PathBuf]) -> Vec<ExtractedDocument> {
        paths
            .iter()
            .filter_map(|path| self.process_file(path))
            .collect()
    }

    /// Stages an upload on disk, processes it once and removes the staged copy.
    pub fn process_raw(
        &self,
        staging: &TempStaging,
        raw: &RawDocument,
    ) -> Option<ExtractedDocument> {
        let staged = match staging.save(raw) {
            Ok(path) => path,
            Err(error) => {
                warn!(file_name = %raw.file_name, %error, "could not stage upload");
                return None;
            }
        };

        let document = self.process_file(&staged);
        if let Err(error) = fs::remove_file(&staged) {
            warn!(path = %staged.display(), %error, "could not delete staged upload");
        }
        document
    }
}

fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(normalize_extension)
}

/// Scratch directory for uploads that have not been processed yet.
#[derive(Debug, Clone)]
pub struct TempStaging {
    dir: PathBuf,
}

impl TempStaging {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the upload under its bare file name; directory parts are discarded.
    pub fn save(&self, raw: &RawDocument) -> Result<PathBuf, IngestError> {
        let name = Path::new(&raw.file_name)
            .file_name()
            .ok_or_else(|| IngestError::MissingFileName(raw.file_name.clone()))?;
        let target = self.dir.join(name);
        fs::write(&target, &raw.bytes)?;
        Ok(target)
    }

    /// Removes every staged file and returns how many were deleted.
    pub fn cleanup(&self) -> Result<usize, IngestError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(error) => warn!(path = %path.display(), %error, "error deleting temp file"),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::docx_bytes;
    use crate::models::Provenance;
    use crate::pdf::tests::FixedExtractor;
    use crate::pdf::PdfExtractor;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn text_file_produces_full_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("Notes.TXT");
        fs::write(&path, b"  Line one.\nLine two.  \n")?;

        let document = DocumentProcessor::default().try_process_file(&path)?;
        assert_eq!(document.text, "Line one.\nLine two.");

        let metadata = &document.metadata;
        assert_eq!(metadata.file_name.as_deref(), Some("Notes.TXT"));
        assert_eq!(metadata.file_type.as_deref(), Some(".txt"));
        assert_eq!(metadata.file_size, Some(24));
        assert_eq!(metadata.checksum, Some(checksum_bytes(b"  Line one.\nLine two.  \n")));
        assert_eq!(metadata.source, Some(Provenance::Upload));
        assert!(metadata.last_modified.is_some());
        assert!(metadata.processing_date.is_some());
        assert!(Path::new(metadata.file_path.as_deref().unwrap_or_default()).is_absolute());
        Ok(())
    }

    #[test]
    fn html_file_is_cleaned() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("page.html");
        fs::write(
            &path,
            "<html><body><p>Visible</p><script>hidden()</script></body></html>",
        )?;

        let document = DocumentProcessor::default().try_process_file(&path)?;
        assert_eq!(document.text, "Visible");
        Ok(())
    }

    #[test]
    fn docx_file_is_extracted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("memo.docx");
        fs::write(
            &path,
            docx_bytes("<w:p><w:r><w:t>Memo body</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t></w:r></w:p>"),
        )?;

        let document = DocumentProcessor::default().try_process_file(&path)?;
        assert_eq!(document.text, "Memo body\nSecond");
        Ok(())
    }

    #[test]
    fn pdf_uses_secondary_strategy_when_primary_is_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.pdf");
        fs::write(&path, b"%PDF-1.4\n%fixture")?;

        let chain = PdfFallbackChain::new(vec![
            Arc::new(FixedExtractor::ok("layout", "  ")) as Arc<dyn PdfExtractor>,
            Arc::new(FixedExtractor::ok("plain", "Page one text\n")),
        ]);
        let processor = DocumentProcessor::default().with_pdf_chain(chain);

        let document = processor.try_process_file(&path)?;
        assert_eq!(document.text, "Page one text");
        Ok(())
    }

    #[test]
    fn unreadable_pdf_is_an_extraction_failure() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let processor = DocumentProcessor::default();
        assert!(matches!(
            processor.try_process_file(&path),
            Err(IngestError::ExtractionFailure(_))
        ));
        assert!(processor.process_file(&path).is_none());
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("tool.exe");
        fs::write(&path, b"MZ")?;

        let processor = DocumentProcessor::default();
        assert!(!processor.is_supported_file(&path));
        assert!(matches!(
            processor.try_process_file(&path),
            Err(IngestError::UnsupportedFormat(_))
        ));
        Ok(())
    }

    #[test]
    fn oversized_file_is_rejected_before_reading() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("big.txt");
        fs::write(&path, vec![b'a'; 64])?;

        let processor = DocumentProcessor::new(ProcessorConfig {
            max_file_size_bytes: 32,
            ..ProcessorConfig::default()
        });
        assert!(matches!(
            processor.try_process_file(&path),
            Err(IngestError::SizeLimitExceeded { size: 64, limit: 32 })
        ));
        Ok(())
    }

    #[test]
    fn empty_and_blank_documents_yield_none() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let empty = dir.path().join("empty.txt");
        let blank = dir.path().join("blank.md");
        fs::write(&empty, b"")?;
        fs::write(&blank, b" \n\t \n")?;

        let processor = DocumentProcessor::default();
        assert!(processor.process_file(&empty).is_none());
        assert!(matches!(
            processor.try_process_file(&blank),
            Err(IngestError::EmptyContent(_))
        ));
        Ok(())
    }

    #[test]
    fn batch_process_keeps_successes_only() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.bin");
        fs::write(&good, b"content")?;
        fs::write(&bad, b"content")?;

        let documents = DocumentProcessor::default().batch_process(&[good, bad]);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].text, "content");
        Ok(())
    }

    #[test]
    fn raw_upload_is_staged_processed_and_deleted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let staging = TempStaging::new(dir.path().join("temp_uploads"))?;
        let raw = RawDocument::new("../escape/report.md", b"# Report\nAll good.".to_vec());

        let document = DocumentProcessor::default()
            .process_raw(&staging, &raw)
            .ok_or("upload should process")?;

        assert_eq!(document.text, "# Report\nAll good.");
        assert_eq!(document.metadata.file_name.as_deref(), Some("report.md"));
        assert!(!staging.dir().join("report.md").exists());
        assert!(!dir.path().join("escape").exists());
        Ok(())
    }

    #[test]
    fn cleanup_removes_staged_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let staging = TempStaging::new(dir.path().join("staging"))?;
        staging.save(&RawDocument::new("a.txt", b"a".to_vec()))?;
        staging.save(&RawDocument::new("b.txt", b"b".to_vec()))?;

        assert_eq!(staging.cleanup()?, 2);
        assert_eq!(fs::read_dir(staging.dir())?.count(), 0);
        Ok(())
    }
}
