//! Paragraph-boundary text chunker with overlap.
//!
//! Splits document bodies on `\n\n` and packs paragraphs into chunks of at
//! most `chunk_chars` bytes, carrying `overlap_chars` of trailing text into
//! the next chunk. Oversized paragraphs are hard-split at space or newline
//! boundaries, never inside a UTF-8 code point.
//!
//! Chunk IDs are deterministic (`<source digest>-<index>`) and indices are
//! contiguous per source, so re-indexing an unchanged file rewrites the same
//! records and delete-by-source catches any leftover tail.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::config::ChunkingConfig;
use crate::models::{Chunk, ChunkMetadata, Document};

/// Split raw text into pieces of roughly `chunk_chars` bytes with
/// `overlap_chars` of carry-over between consecutive pieces.
///
/// A piece may exceed the budget by the overlap carry plus separator; a
/// flush never emits the carry alone.
pub fn split_text(text: &str, chunk_chars: usize, overlap_chars: usize) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // A paragraph that can never fit is split on its own.
        if trimmed.len() > chunk_chars {
            if !buf.is_empty() {
                pieces.push(std::mem::take(&mut buf));
            }
            hard_split(trimmed, chunk_chars, overlap_chars, &mut pieces);
            continue;
        }

        let would_be = if buf.is_empty() {
            trimmed.len()
        } else {
            buf.len() + 2 + trimmed.len()
        };

        if would_be > chunk_chars && !buf.is_empty() {
            let carry = tail(&buf, overlap_chars).to_string();
            pieces.push(std::mem::take(&mut buf));
            buf = carry;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(trimmed);
    }

    let final_piece = buf.trim();
    if !final_piece.is_empty() {
        pieces.push(final_piece.to_string());
    }

    pieces
}

/// Chunk a batch of loaded documents, assigning contiguous indices per
/// source. CSV rows from the same file share one index sequence.
pub fn chunk_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut next_index: HashMap<&str, i64> = HashMap::new();
    let mut chunks = Vec::new();

    for doc in documents {
        let digest = source_digest(&doc.source);
        for text in split_text(&doc.body, config.chunk_chars, config.overlap_chars) {
            let counter = next_index.entry(doc.source.as_str()).or_insert(0);
            let index = *counter;
            *counter += 1;

            chunks.push(Chunk {
                id: format!("{}-{}", digest, index),
                source: doc.source.clone(),
                chunk_index: index,
                metadata: ChunkMetadata {
                    source: doc.source.clone(),
                    hash: doc.hash.clone(),
                    chunk_index: index,
                    page: doc.page,
                    row: doc.row,
                    text: text.clone(),
                },
                text,
            });
        }
    }

    chunks
}

/// First 16 hex chars of SHA-256(source) — the stable per-file ID prefix.
pub fn source_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let full = format!("{:x}", hasher.finalize());
    full[..16].to_string()
}

/// Split a single oversized paragraph at space/newline boundaries.
fn hard_split(text: &str, chunk_chars: usize, overlap_chars: usize, out: &mut Vec<String>) {
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= chunk_chars {
            let piece = remaining.trim();
            if !piece.is_empty() {
                out.push(piece.to_string());
            }
            break;
        }

        // Largest char-boundary split point within the budget.
        let mut split_at = chunk_chars;
        while split_at > 0 && !remaining.is_char_boundary(split_at) {
            split_at -= 1;
        }
        if split_at == 0 {
            split_at = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }

        // Prefer a newline or space boundary inside the window.
        let actual = remaining[..split_at]
            .rfind('\n')
            .or_else(|| remaining[..split_at].rfind(' '))
            .map(|pos| pos + 1)
            .filter(|&pos| pos > 0)
            .unwrap_or(split_at);

        let piece = remaining[..actual].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }

        // Back up by the overlap, but always make forward progress.
        let mut next_start = if actual > overlap_chars {
            actual - overlap_chars
        } else {
            actual
        };
        while next_start < remaining.len() && !remaining.is_char_boundary(next_start) {
            next_start += 1;
        }
        if next_start == 0 {
            next_start = actual;
        }
        remaining = &remaining[next_start..];
    }
}

/// Up to `max_bytes` of trailing text, starting at a char boundary.
fn tail(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, body: &str) -> Document {
        Document {
            source: source.to_string(),
            hash: "h".repeat(64),
            page: None,
            row: None,
            body: body.to_string(),
        }
    }

    fn config(chunk_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_chars,
            overlap_chars,
        }
    }

    #[test]
    fn small_text_single_chunk() {
        let pieces = split_text("Hello, world!", 1000, 100);
        assert_eq!(pieces, vec!["Hello, world!"]);
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(split_text("", 1000, 100).is_empty());
        assert!(split_text("  \n\n  ", 1000, 100).is_empty());
    }

    #[test]
    fn paragraphs_under_limit_are_packed() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let pieces = split_text(text, 1000, 100);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].contains("First paragraph."));
        assert!(pieces[0].contains("Third paragraph."));
    }

    #[test]
    fn paragraphs_over_limit_are_split() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let pieces = split_text(text, 30, 0);
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.len() <= 30, "piece too long: {:?}", piece);
        }
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let text = "aaaa aaaa aaaa.\n\nbbbb bbbb bbbb.\n\ncccc cccc cccc.";
        let pieces = split_text(text, 20, 8);
        assert!(pieces.len() >= 2);
        for pair in pieces.windows(2) {
            let prev_tail = tail(&pair[0], 8);
            assert!(
                pair[1].starts_with(prev_tail.trim_start()) || pair[1].starts_with(prev_tail),
                "expected {:?} to start with overlap {:?}",
                pair[1],
                prev_tail
            );
        }
    }

    #[test]
    fn oversized_paragraph_hard_split_respects_budget() {
        let word = "word ".repeat(100);
        let pieces = split_text(word.trim(), 32, 4);
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.len() <= 32);
        }
    }

    #[test]
    fn hard_split_never_breaks_utf8() {
        let text = "émoji 🦀 çharacters ".repeat(50);
        let pieces = split_text(text.trim(), 25, 5);
        // Reaching here without a panic means every slice hit a char boundary.
        assert!(!pieces.is_empty());
    }

    #[test]
    fn deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let a = split_text(text, 12, 4);
        let b = split_text(text, 12, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn document_chunks_have_contiguous_indices_and_stable_ids() {
        let body = (0..30)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let docs = vec![doc("dir/notes.txt", &body)];
        let chunks = chunk_documents(&docs, &config(60, 10));
        assert!(chunks.len() > 1);
        let digest = source_digest("dir/notes.txt");
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i64);
            assert_eq!(chunk.id, format!("{}-{}", digest, i));
            assert_eq!(chunk.metadata.chunk_index, i as i64);
        }
    }

    #[test]
    fn csv_rows_share_one_index_sequence() {
        let mut row0 = doc("data.csv", "id: 1\nname: Alice");
        row0.row = Some(0);
        let mut row1 = doc("data.csv", "id: 2\nname: Bob");
        row1.row = Some(1);
        let chunks = chunk_documents(&[row0, row1], &config(1000, 100));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[0].metadata.row, Some(0));
        assert_eq!(chunks[1].metadata.row, Some(1));
    }

    #[test]
    fn different_sources_get_different_id_prefixes() {
        let chunks = chunk_documents(
            &[doc("a.txt", "alpha"), doc("b.txt", "beta")],
            &config(1000, 100),
        );
        assert_eq!(chunks.len(), 2);
        assert_ne!(
            chunks[0].id.split('-').next(),
            chunks[1].id.split('-').next()
        );
    }
}
