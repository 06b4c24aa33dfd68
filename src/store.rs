//! Vector database abstraction.
//!
//! The [`VectorStore`] trait covers the four operations the pipeline needs:
//! lazy index creation, batched upsert, delete-by-source, and similarity
//! query. [`PineconeStore`](crate::pinecone::PineconeStore) is the hosted
//! backend; [`MemoryStore`] is an in-process implementation used by tests.
//!
//! The re-index invariant lives in [`replace_source`]: before a file's
//! vectors are inserted, everything previously stored for that source is
//! deleted, so a changed or shrunken file never leaves stale chunks behind.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::embedding::cosine_similarity;
use crate::models::{QueryMatch, VectorRecord};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Make sure the backing index exists and accepts vectors of `dims`
    /// dimensions. Called once before the first upsert.
    async fn ensure_ready(&self, dims: usize) -> Result<()>;

    /// Insert or overwrite records. IDs are deterministic, so re-upserting
    /// the same chunk replaces it in place.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Delete every vector whose metadata `source` equals the given value.
    async fn delete_by_source(&self, source: &str) -> Result<()>;

    /// Return the `top_k` nearest records by cosine similarity.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;
}

/// Delete-before-insert for one source: the re-index step.
pub async fn replace_source(
    store: &dyn VectorStore,
    source: &str,
    records: &[VectorRecord],
) -> Result<()> {
    store.delete_by_source(source).await?;
    store.upsert(records).await?;
    Ok(())
}

/// In-memory store with an exact cosine scan. Test backend.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, VectorRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_ready(&self, _dims: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut map = self.records.lock().unwrap();
        for record in records {
            map.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn delete_by_source(&self, source: &str) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .retain(|_, record| record.metadata.source != source);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let map = self.records.lock().unwrap();
        let mut matches: Vec<QueryMatch> = map
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
