//! Core data types for the indexing and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// One logical text unit produced by the loader: a whole file for
/// txt/md/pdf/docx, or a single row for CSV files.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the indexing root.
    pub source: String,
    /// SHA-256 of the file bytes, hex-encoded.
    pub hash: String,
    /// Page number (1-based) when the format exposes pages.
    pub page: Option<i64>,
    /// Row number (0-based) for CSV-derived documents.
    pub row: Option<i64>,
    /// Extracted plain text.
    pub body: String,
}

/// A chunk of a document's body, ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Deterministic ID: `<first 16 hex chars of SHA-256(source)>-<index>`.
    pub id: String,
    pub source: String,
    /// Contiguous per-source index starting at 0.
    pub chunk_index: i64,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Metadata stored alongside each vector in the index.
///
/// `source` is the filter key for delete-before-insert; `text` is carried so
/// query results can be turned into LLM context without a second fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub source: String,
    pub hash: String,
    pub chunk_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<i64>,
    pub text: String,
}

/// A vector record as sent to the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A scored match returned from a similarity query.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}
