//! Content hashes used for change detection.
//!
//! Two digests exist side by side: the processor hashes the raw file bytes
//! into its metadata, while [`document_checksum`] hashes the extracted text
//! and is attached to every chunk record.

use sha2::{Digest, Sha256};

pub fn checksum_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Digest of the extracted document text.
pub fn document_checksum(text: &str) -> String {
    checksum_bytes(text.as_bytes())
}

/// Stable record-id prefix for a document that has no caller-supplied id.
pub fn path_digest(file_path: &str) -> String {
    checksum_bytes(file_path.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_checksum_is_stable() {
        let first = document_checksum("Pumps must be primed before start.");
        let second = document_checksum("Pumps must be primed before start.");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn document_checksum_changes_with_content() {
        assert_ne!(document_checksum("revision A"), document_checksum("revision B"));
    }

    #[test]
    fn text_and_byte_digests_agree() {
        assert_eq!(document_checksum("abc"), checksum_bytes(b"abc"));
        assert_eq!(
            checksum_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn path_digest_differs_per_path() {
        assert_eq!(path_digest("/data/a.pdf"), path_digest("/data/a.pdf"));
        assert_ne!(path_digest("/data/a.pdf"), path_digest("/data/b.pdf"));
    }
}
