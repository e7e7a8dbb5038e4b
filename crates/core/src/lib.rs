pub mod checksum;
pub mod chunking;
pub mod config;
pub mod default_content;
pub mod error;
pub mod extractor;
pub mod indexer;
pub mod ingest;
pub mod models;
pub mod pdf;
pub mod processor;
pub mod stores;
pub mod traits;

pub use checksum::{checksum_bytes, document_checksum, path_digest};
pub use chunking::{
    chunk_text, split_sentences, ChunkingConfig, OverlapMode, DEFAULT_CHUNK_MAX_CHARS,
    DEFAULT_CHUNK_OVERLAP_CHARS,
};
pub use config::{
    IndexSettings, ProcessorConfig, DEFAULT_INDEX_DESCRIPTION, DEFAULT_INDEX_NAME,
    DEFAULT_MAX_FILE_SIZE_BYTES,
};
pub use default_content::{DefaultContentLoader, DefaultContentStatus};
pub use error::{IndexError, IngestError};
pub use extractor::{extract_text, FileFamily};
pub use indexer::{acquire_index, build_records, document_exists, upsert_document};
pub use ingest::{discover_supported_files, ingest_files, ingest_folder};
pub use models::{
    DocumentMetadata, ExtractedDocument, FileOutcome, IndexFilter, IndexInfo, IndexQuery,
    IndexRecord, IngestionReport, Provenance, RawDocument, RecordAttributes, SearchResponse,
    SkippedFile, UpsertOutcome, UNKNOWN_PATH,
};
pub use pdf::{LayoutPdfExtractor, LopdfExtractor, PdfExtractor, PdfFallbackChain};
pub use processor::{DocumentProcessor, TempStaging};
pub use stores::{HttpIndex, HttpIndexProvider, MemoryIndex};
pub use traits::{DocumentIndex, IndexProvider};
