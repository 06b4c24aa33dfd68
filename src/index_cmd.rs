//! `index` command: load files, chunk, embed, and sync into the vector store.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::chunk;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::loader;
use crate::models::{Chunk, VectorRecord};
use crate::store::{self, VectorStore};

pub struct IndexOptions {
    pub recursive: bool,
    pub dry_run: bool,
    pub limit: Option<usize>,
}

pub async fn run_index(config: &Config, path: &Path, options: &IndexOptions) -> Result<()> {
    let outcome = loader::load(path, options.recursive)?;
    let mut documents = outcome.documents;
    if let Some(limit) = options.limit {
        documents.truncate(limit);
    }
    info!(
        files = outcome.files_seen,
        documents = documents.len(),
        "loaded input"
    );

    let chunks = chunk::chunk_documents(&documents, &config.chunking);
    if chunks.is_empty() {
        println!("Nothing to index: no text extracted from {}", path.display());
        return Ok(());
    }

    if options.dry_run {
        print_dry_run(outcome.files_seen, documents.len(), &chunks);
        return Ok(());
    }

    let embedder = Embedder::new(&config.embedding)?;
    let store = crate::pinecone::PineconeStore::new(&config.pinecone)?;
    let vectors = embed_chunks(&embedder, &chunks).await?;

    let dims = vectors[0].values.len();
    store.ensure_ready(dims).await?;

    // Group by source so each file is synced atomically: stale chunks for
    // that file are deleted before its fresh ones go in.
    let mut by_source: BTreeMap<String, Vec<VectorRecord>> = BTreeMap::new();
    for record in vectors {
        by_source
            .entry(record.metadata.source.clone())
            .or_default()
            .push(record);
    }

    let source_count = by_source.len();
    let mut upserted = 0usize;
    for (source, records) in &by_source {
        info!(source = %source, chunks = records.len(), "syncing source");
        store::replace_source(&store, source, records).await?;
        upserted += records.len();
    }

    println!("Indexed {}", path.display());
    println!("  files:     {}", outcome.files_seen);
    println!("  documents: {}", documents.len());
    println!("  sources:   {}", source_count);
    println!("  vectors:   {} ({} dims, {})", upserted, dims, embedder.model_name());
    Ok(())
}

fn print_dry_run(files: usize, documents: usize, chunks: &[Chunk]) {
    println!("Dry run: nothing was embedded or uploaded.");
    println!("  files:     {}", files);
    println!("  documents: {}", documents);
    println!("  chunks:    {}", chunks.len());
    for chunk in chunks.iter().take(5) {
        let preview: String = chunk.text.chars().take(60).collect();
        println!("  {} {:?}", chunk.id, preview);
    }
    if chunks.len() > 5 {
        println!("  ... and {} more", chunks.len() - 5);
    }
}

/// Embed chunk texts in provider-sized batches and pair each vector with
/// its chunk metadata.
async fn embed_chunks(embedder: &Embedder, chunks: &[Chunk]) -> Result<Vec<VectorRecord>> {
    let mut records = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(embedder.batch_size()) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        for (chunk, values) in batch.iter().zip(vectors) {
            records.push(VectorRecord {
                id: chunk.id.clone(),
                values,
                metadata: chunk.metadata.clone(),
            });
        }
        info!(embedded = records.len(), total = chunks.len(), "embedding progress");
    }
    Ok(records)
}
