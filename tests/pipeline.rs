//! End-to-end pipeline tests: extraction, chunking, naming, persistence,
//! artifact materialization, and batch outcome classification.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use docshard::chunk::ChunkStrategy;
use docshard::config::{ChunkingConfig, Config, DbConfig, IngestConfig, ServerConfig};
use docshard::ingest::{ingest_file, run_batch, IngestFailure, IngestOutcome};
use docshard::models::DocumentFormat;
use docshard::progress::NoReporter;
use docshard::store::memory::InMemoryStore;
use docshard::store::DocumentStore;

fn test_config(tmp: &TempDir) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("data/docshard.sqlite"),
        },
        chunking: ChunkingConfig::default(),
        ingest: IngestConfig {
            output_root: tmp.path().join("chunks_data"),
            workers: 2,
            exclude_globs: Vec::new(),
            materialize: true,
        },
        server: ServerConfig {
            bind: "127.0.0.1:7400".to_string(),
        },
    }
}

/// Minimal valid single-page PDF showing `phrase` (empty phrase → a valid
/// page with no text layer). Builds body then xref with correct byte
/// offsets so the extractor can parse it.
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let stream = if phrase.is_empty() {
        String::new()
    } else {
        format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase)
    };
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal DOCX (ZIP) whose `word/document.xml` holds one paragraph per
/// entry in `paragraphs`.
fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

#[tokio::test]
async fn mixed_directory_reports_success_failure_skip() {
    let tmp = TempDir::new().unwrap();
    let config = Arc::new(test_config(&tmp));
    let store = Arc::new(InMemoryStore::new());

    let input = tmp.path().join("input_docs");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("sample.txt"), "Hello world. This is a test.").unwrap();
    std::fs::write(input.join("broken.pdf"), b"not a pdf").unwrap();
    std::fs::write(input.join("notes.xyz"), "unsupported").unwrap();

    let report = run_batch(
        store.clone(),
        config,
        Arc::new(NoReporter),
        &input,
        ChunkStrategy::Sentence,
    )
    .await
    .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);

    let docs = store.list_documents(None, 50, 0).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "sample.txt");
    assert_eq!(docs[0].format, DocumentFormat::Text);
    assert_eq!(docs[0].chunk_count, 1);
}

#[tokio::test]
async fn missing_root_is_a_top_level_error() {
    let tmp = TempDir::new().unwrap();
    let config = Arc::new(test_config(&tmp));
    let store = Arc::new(InMemoryStore::new());

    let result = run_batch(
        store.clone(),
        config,
        Arc::new(NoReporter),
        &tmp.path().join("does_not_exist"),
        ChunkStrategy::Sentence,
    )
    .await;

    assert!(result.is_err());
    assert!(store.list_documents(None, 50, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_extension_is_skipped_not_failed() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("archive.zip");
    std::fs::write(&path, b"whatever").unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Sentence).await;
    match outcome {
        IngestOutcome::Skipped { reason } => assert_eq!(reason, "unsupported format"),
        other => panic!("expected skip, got {:?}", other),
    }
}

#[tokio::test]
async fn pdf_with_text_ingests_and_keeps_its_words() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("report.pdf");
    std::fs::write(&path, minimal_pdf("Quarterly figures improved.")).unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Sentence).await;
    let (document_id, chunk_count) = match outcome {
        IngestOutcome::Success {
            document_id,
            chunk_count,
            ..
        } => (document_id, chunk_count),
        other => panic!("expected success, got {:?}", other),
    };
    assert!(chunk_count >= 1);

    let chunks = store.get_chunks(&document_id).await.unwrap();
    let combined: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert!(combined.contains("Quarterly"));

    let doc = store.get_document(&document_id).await.unwrap().unwrap();
    assert_eq!(doc.format, DocumentFormat::Pdf);
    assert_eq!(doc.chunk_count as usize, chunks.len());
}

#[tokio::test]
async fn textless_pdf_is_a_policy_failure() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("scan.pdf");
    std::fs::write(&path, minimal_pdf("")).unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Sentence).await;
    match outcome {
        IngestOutcome::Failed { error } => {
            assert!(error.is_policy(), "expected policy failure, got {}", error);
            assert!(matches!(error, IngestFailure::NoExtractableText));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(store.list_documents(None, 50, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn docx_paragraphs_survive_into_chunks() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("notes.docx");
    std::fs::write(
        &path,
        minimal_docx(&["First paragraph of notes.", "Second paragraph of notes."]),
    )
    .unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Paragraph).await;
    let document_id = match outcome {
        IngestOutcome::Success { document_id, .. } => document_id,
        other => panic!("expected success, got {:?}", other),
    };

    let chunks = store.get_chunks(&document_id).await.unwrap();
    let combined: String = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(combined.contains("First paragraph of notes."));
    assert!(combined.contains("Second paragraph of notes."));
}

#[tokio::test]
async fn empty_docx_ingests_with_zero_chunks() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("blank.docx");
    std::fs::write(&path, minimal_docx(&[])).unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Sentence).await;
    let (document_id, chunk_count) = match outcome {
        IngestOutcome::Success {
            document_id,
            chunk_count,
            ..
        } => (document_id, chunk_count),
        other => panic!("expected success, got {:?}", other),
    };
    assert_eq!(chunk_count, 0);

    let doc = store.get_document(&document_id).await.unwrap().unwrap();
    assert_eq!(doc.chunk_count, 0);
    assert!(store.get_chunks(&document_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_names_get_numbered_suffixes() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("sample.txt");
    std::fs::write(&path, "Same file, ingested repeatedly.").unwrap();

    for _ in 0..3 {
        let outcome =
            ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Sentence).await;
        assert!(matches!(outcome, IngestOutcome::Success { .. }));
    }

    for name in ["sample.txt", "sample(1).txt", "sample(2).txt"] {
        assert!(store.name_exists(name).await.unwrap(), "missing {}", name);
    }
    assert!(!store.name_exists("sample(3).txt").await.unwrap());
}

#[tokio::test]
async fn artifacts_mirror_the_persisted_chunks() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("lines.txt");
    std::fs::write(&path, "alpha line\nbeta line\ngamma line").unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Paragraph).await;
    let (document_id, warnings) = match outcome {
        IngestOutcome::Success {
            document_id,
            warnings,
            ..
        } => (document_id, warnings),
        other => panic!("expected success, got {:?}", other),
    };
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);

    let chunks = store.get_chunks(&document_id).await.unwrap();
    let artifact_dir: PathBuf = config
        .ingest
        .output_root
        .join("lines_txt_paragraph_chunks");
    assert!(artifact_dir.is_dir());

    for chunk in &chunks {
        let file = artifact_dir.join(format!("chunk_{}", chunk.index));
        let written = std::fs::read_to_string(&file).unwrap();
        assert_eq!(written, chunk.content);
    }
    assert_eq!(
        std::fs::read_dir(&artifact_dir).unwrap().count(),
        chunks.len()
    );
}

#[tokio::test]
async fn failed_artifact_writes_become_warnings_not_failures() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    // Point the artifact root at a regular file so directory creation fails.
    let blocker = tmp.path().join("blocked");
    std::fs::write(&blocker, "in the way").unwrap();
    config.ingest.output_root = blocker;

    let store = InMemoryStore::new();
    let path = tmp.path().join("sample.txt");
    std::fs::write(&path, "Still ingests fine.").unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Sentence).await;
    match outcome {
        IngestOutcome::Success { warnings, .. } => {
            assert!(!warnings.is_empty(), "expected a materialization warning");
        }
        other => panic!("expected success with warnings, got {:?}", other),
    }
}

#[tokio::test]
async fn excluded_globs_are_not_visited() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.ingest.exclude_globs = vec!["skipme/**".to_string()];

    let store = Arc::new(InMemoryStore::new());
    let input = tmp.path().join("input_docs");
    std::fs::create_dir_all(input.join("skipme")).unwrap();
    std::fs::write(input.join("keep.txt"), "Kept content.").unwrap();
    std::fs::write(input.join("skipme/hidden.txt"), "Never visited.").unwrap();

    let report = run_batch(
        store.clone(),
        Arc::new(config),
        Arc::new(NoReporter),
        &input,
        ChunkStrategy::Sentence,
    )
    .await
    .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn deleting_a_document_cascades_to_chunks() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = InMemoryStore::new();

    let path = tmp.path().join("sample.txt");
    std::fs::write(&path, "One sentence. Another sentence.").unwrap();

    let outcome = ingest_file(&store, &config, &NoReporter, &path, ChunkStrategy::Sentence).await;
    let document_id = match outcome {
        IngestOutcome::Success { document_id, .. } => document_id,
        other => panic!("expected success, got {:?}", other),
    };
    assert!(!store.get_chunks(&document_id).await.unwrap().is_empty());

    assert!(store.delete_document(&document_id).await.unwrap());
    assert!(store.get_chunks(&document_id).await.unwrap().is_empty());
    assert!(store.get_document(&document_id).await.unwrap().is_none());
}
