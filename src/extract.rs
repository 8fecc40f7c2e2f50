//! Format-specific text extraction.
//!
//! One extractor per supported [`DocumentFormat`]; each turns a file path
//! into plain UTF-8 text plus format metadata. Extractors hold no state
//! and are dispatched exhaustively by the ingestor.

use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::models::DocumentFormat;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure. `NoTextLayer` is not a parse failure: the document
/// opened cleanly but carries no extractable text (a scanned PDF), which
/// the ingestor reports as a policy outcome rather than an error.
#[derive(Debug)]
pub enum ExtractError {
    Io(std::io::Error),
    Pdf(String),
    Docx(String),
    NoTextLayer,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "could not read file: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
            ExtractError::NoTextLayer => write!(f, "no text layer (scanned document?)"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Raw extraction output, consumed immediately by the ingestor and never
/// persisted as such.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub content: String,
    pub size_bytes: u64,
    /// PDF only.
    pub page_count: Option<usize>,
    /// DOCX only: paragraphs retained after dropping blank ones.
    pub paragraph_count: Option<usize>,
}

/// Extracts text and metadata from `path` according to `format`.
pub fn extract(path: &Path, format: DocumentFormat) -> Result<Extraction, ExtractError> {
    match format {
        DocumentFormat::Text => extract_text_file(path),
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Docx => extract_docx(path),
    }
}

/// Plain text: detect the byte encoding from the raw sample and decode
/// with replacement, so the only failure mode is an unreadable path.
fn extract_text_file(path: &Path) -> Result<Extraction, ExtractError> {
    let bytes = std::fs::read(path).map_err(ExtractError::Io)?;
    let size_bytes = bytes.len() as u64;

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(&bytes, true);
    let encoding = detector.guess(None, true);
    let (content, _, _) = encoding.decode(&bytes);

    Ok(Extraction {
        content: content.into_owned(),
        size_bytes,
        page_count: None,
        paragraph_count: None,
    })
}

/// PDF: page-ordered text, pages separated by a newline. Whitespace-only
/// output means the file has no text layer.
fn extract_pdf(path: &Path) -> Result<Extraction, ExtractError> {
    let bytes = std::fs::read(path).map_err(ExtractError::Io)?;
    let size_bytes = bytes.len() as u64;

    let content =
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let page_count = lopdf::Document::load_mem(&bytes)
        .map(|doc| doc.get_pages().len())
        .unwrap_or(1);

    if content.trim().is_empty() {
        return Err(ExtractError::NoTextLayer);
    }

    Ok(Extraction {
        content,
        size_bytes,
        page_count: Some(page_count),
        paragraph_count: None,
    })
}

/// DOCX: paragraph text nodes in document order, blank paragraphs dropped,
/// survivors joined with a newline.
fn extract_docx(path: &Path) -> Result<Extraction, ExtractError> {
    let bytes = std::fs::read(path).map_err(ExtractError::Io)?;
    let size_bytes = bytes.len() as u64;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Docx(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    let paragraphs = read_paragraphs(&doc_xml)?;
    let paragraph_count = paragraphs.len();

    Ok(Extraction {
        content: paragraphs.join("\n"),
        size_bytes,
        page_count: None,
        paragraph_count: Some(paragraph_count),
    })
}

/// Collects `w:t` runs grouped by their enclosing `w:p` paragraph.
fn read_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        current.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        paragraphs.push(trimmed.to_string());
                    }
                    current.clear();
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}
