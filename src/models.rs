//! Core data types used throughout docshard.
//!
//! These types represent the documents and chunks that flow through the
//! ingestion pipeline and into the persistence store.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The closed set of supported document formats.
///
/// Dispatching over this enum (rather than a runtime extension lookup)
/// keeps the extractor selection exhaustive at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Maps a file extension (without the dot, case-insensitive) onto the
    /// format set. Unknown extensions are unsupported and yield `None`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Resolves a path's extension to a format, if supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Inverse of [`as_str`](Self::as_str), used when reading rows back
    /// from the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

/// Persisted per-document metadata.
///
/// `id` is an opaque UUID assigned once, at creation. `name` is unique
/// among live documents; uniqueness is resolved by the namer before the
/// insert and enforced by the store's unique constraint.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub source_path: String,
    pub format: DocumentFormat,
    pub size_bytes: i64,
    pub chunk_count: i64,
    /// Unix seconds.
    pub created_at: i64,
}

/// A bounded-size, ordered fragment of a document's extracted text.
///
/// Indices for a document are contiguous from 0 and are the sole carrier
/// of original document order.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub document_id: String,
    pub index: i64,
    /// Non-empty after trim.
    pub content: String,
    pub char_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("TXT"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_extension("Pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("xyz"), None);
    }

    #[test]
    fn from_path_reads_the_final_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("/in/report.final.docx")),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("/in/no_extension")), None);
    }

    #[test]
    fn format_round_trips_through_str() {
        for fmt in [DocumentFormat::Text, DocumentFormat::Pdf, DocumentFormat::Docx] {
            assert_eq!(DocumentFormat::parse(fmt.as_str()), Some(fmt));
        }
        assert_eq!(DocumentFormat::parse("markdown"), None);
    }
}
