use crate::extractor::{normalize_extension, FileFamily};
use crate::models::Provenance;

pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_INDEX_NAME: &str = "Knowledge Base";
pub const DEFAULT_INDEX_DESCRIPTION: &str = "Knowledge base for document storage and retrieval";

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_file_size_bytes: u64,
    pub text_extensions: Vec<String>,
    pub office_extensions: Vec<String>,
    pub pdf_extensions: Vec<String>,
    pub provenance: Provenance,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            text_extensions: [".txt", ".md", ".html", ".htm"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            office_extensions: vec![".docx".to_string()],
            pdf_extensions: vec![".pdf".to_string()],
            provenance: Provenance::Upload,
        }
    }
}

impl ProcessorConfig {
    /// Family for a file extension, with or without the leading dot.
    pub fn family_of(&self, extension: &str) -> Option<FileFamily> {
        let extension = normalize_extension(extension);
        let listed = |candidates: &[String]| candidates.iter().any(|item| *item == extension);

        if listed(&self.pdf_extensions) {
            Some(FileFamily::Pdf)
        } else if listed(&self.office_extensions) {
            Some(FileFamily::Office)
        } else if listed(&self.text_extensions) {
            Some(FileFamily::Text)
        } else {
            None
        }
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        self.pdf_extensions
            .iter()
            .chain(&self.office_extensions)
            .chain(&self.text_extensions)
            .map(String::as_str)
            .collect()
    }
}

/// Where documents end up and how a missing index gets created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub default_index_id: Option<String>,
    pub index_name: String,
    pub description: String,
    pub embedding_model: Option<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            default_index_id: None,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            description: DEFAULT_INDEX_DESCRIPTION.to_string(),
            embedding_model: None,
        }
    }
}

impl IndexSettings {
    /// Reads `DOCINGEST_INDEX_URL`, `DOCINGEST_API_KEY`, `DOCINGEST_INDEX_ID`,
    /// `DOCINGEST_INDEX_NAME` and `DOCINGEST_EMBEDDING_MODEL`. Blank values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key).and_then(|value| {
                let value = value.trim().to_string();
                if value.is_empty() {
                    None
                } else {
                    Some(value)
                }
            })
        };

        let defaults = Self::default();
        Self {
            endpoint: read("DOCINGEST_INDEX_URL"),
            api_key: read("DOCINGEST_API_KEY"),
            default_index_id: read("DOCINGEST_INDEX_ID"),
            index_name: read("DOCINGEST_INDEX_NAME").unwrap_or(defaults.index_name),
            description: defaults.description,
            embedding_model: read("DOCINGEST_EMBEDDING_MODEL"),
        }
    }
}
