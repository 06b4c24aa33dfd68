//! Document loading: walk a file or directory and turn supported files into
//! [`Document`]s ready for chunking.
//!
//! Supported extensions: `.txt`, `.md`, `.pdf`, `.docx`, `.csv`. Anything
//! else is skipped. A file that fails to parse logs a warning and is skipped;
//! a single bad file never aborts the run.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::extract;
use crate::models::Document;

const SUPPORTED: &[&str] = &["txt", "md", "pdf", "docx", "csv"];

/// Result of a load pass: the documents plus the number of files they came from.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub files_seen: usize,
}

/// Load documents from a file or directory.
///
/// For a directory, only the top level is scanned unless `recursive` is set.
/// `source` fields are paths relative to the directory (or the file name when
/// `path` is a single file), so re-indexing the same tree produces stable
/// identifiers.
pub fn load(path: &Path, recursive: bool) -> Result<LoadOutcome> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        if !is_supported(path) {
            return Ok(LoadOutcome::default());
        }
        let documents = load_file(path, &source);
        return Ok(LoadOutcome {
            documents,
            files_seen: 1,
        });
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut outcome = LoadOutcome::default();

    let mut entries: Vec<_> = WalkDir::new(path)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    // Sort for deterministic ordering across runs.
    entries.sort_by_key(|e| e.path().to_path_buf());

    for entry in entries {
        let file_path = entry.path();
        if !is_supported(file_path) {
            continue;
        }
        let relative = file_path.strip_prefix(path).unwrap_or(file_path);
        let source = relative.to_string_lossy().to_string();
        outcome.files_seen += 1;
        outcome.documents.extend(load_file(file_path, &source));
    }

    Ok(outcome)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load a single file into zero or more documents. Parse failures are
/// downgraded to warnings so the surrounding walk continues.
fn load_file(path: &Path, source: &str) -> Vec<Document> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!(source, error = %e, "skipping unreadable file");
            return Vec::new();
        }
    };

    let hash = file_hash(&bytes);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "md" => vec![text_document(source, &hash, &bytes)],
        "pdf" => match extract::extract_pdf(&bytes) {
            Ok(body) => vec![Document {
                source: source.to_string(),
                hash,
                page: None,
                row: None,
                body,
            }],
            Err(e) => {
                warn!(source, error = %e, "skipping PDF");
                Vec::new()
            }
        },
        "docx" => match extract::extract_docx(&bytes) {
            Ok(body) => vec![Document {
                source: source.to_string(),
                hash,
                page: None,
                row: None,
                body,
            }],
            Err(e) => {
                warn!(source, error = %e, "skipping DOCX");
                Vec::new()
            }
        },
        "csv" => match load_csv(source, &hash, &bytes) {
            Ok(docs) => docs,
            Err(e) => {
                warn!(source, error = %e, "CSV parse failed; reading as raw text");
                vec![text_document(source, &hash, &bytes)]
            }
        },
        _ => Vec::new(),
    }
}

fn text_document(source: &str, hash: &str, bytes: &[u8]) -> Document {
    Document {
        source: source.to_string(),
        hash: hash.to_string(),
        page: None,
        row: None,
        body: String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// One document per CSV row, formatted `<header>: <value>` per line.
/// Empty cells are omitted.
fn load_csv(source: &str, hash: &str, bytes: &[u8]) -> Result<Vec<Document>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();
    let mut docs = Vec::new();

    for (row_index, record) in reader.records().enumerate() {
        let record = record?;
        let body = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(header, value)| format!("{}: {}", header, value))
            .collect::<Vec<_>>()
            .join("\n");
        docs.push(Document {
            source: source.to_string(),
            hash: hash.to_string(),
            page: None,
            row: Some(row_index as i64),
            body,
        });
    }

    Ok(docs)
}

fn file_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
