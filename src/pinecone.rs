//! Pinecone REST client implementing [`VectorStore`].
//!
//! Two planes are involved:
//! - the **control plane** (`https://api.pinecone.io`) for describing and
//!   creating the index — creation is lazy, triggered by the first
//!   `ensure_ready` call with the embedding dimension, as a serverless
//!   cosine index in aws/us-east-1;
//! - the **data plane** (the per-index host returned by describe) for
//!   upsert, list, delete, and query.
//!
//! Serverless indexes do not support metadata-filter deletes, so
//! `delete_by_source` lists vector IDs by the deterministic source-digest
//! prefix and deletes them by ID.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

use crate::chunk::source_digest;
use crate::config::PineconeConfig;
use crate::http::{get_json, post_json_with_retry};
use crate::models::{ChunkMetadata, QueryMatch, VectorRecord};
use crate::store::VectorStore;

pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    index_name: String,
    config: PineconeConfig,
    /// Data-plane base URL, resolved on first use.
    data_url: Mutex<Option<String>>,
}

impl PineconeStore {
    /// Build a store from config. Requires `PINECONE_API_KEY` and an index
    /// name (config or `PINECONE_INDEX_NAME`).
    pub fn new(config: &PineconeConfig) -> Result<Self> {
        let api_key = std::env::var("PINECONE_API_KEY")
            .context("PINECONE_API_KEY environment variable not set")?;
        let index_name = config.index_name()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            index_name,
            config: config.clone(),
            data_url: Mutex::new(None),
        })
    }

    fn cached_data_url(&self) -> Option<String> {
        self.data_url.lock().unwrap().clone()
    }

    fn cache_data_url(&self, host: &str) {
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host)
        };
        *self.data_url.lock().unwrap() = Some(url);
    }

    /// Resolve the data-plane host, creating the index first when it does
    /// not exist and `create_dims` is given.
    async fn resolve_data_url(&self, create_dims: Option<usize>) -> Result<String> {
        if let Some(url) = self.cached_data_url() {
            return Ok(url);
        }

        let describe_url = format!(
            "{}/indexes/{}",
            self.config.control_url.trim_end_matches('/'),
            self.index_name
        );
        let (status, json) = get_json(
            &self.client,
            &describe_url,
            &[("Api-Key", self.api_key.as_str())],
            &[],
        )
        .await?;

        let host = match status {
            200 => json
                .get("host")
                .and_then(|h| h.as_str())
                .map(|h| h.to_string())
                .ok_or_else(|| anyhow::anyhow!("describe index response is missing host"))?,
            404 => match create_dims {
                Some(dims) => self.create_index(dims).await?,
                None => bail!(
                    "Pinecone index '{}' does not exist. Run `ragdex index` first.",
                    self.index_name
                ),
            },
            other => bail!(
                "Pinecone describe index returned {}: {}",
                other,
                json
            ),
        };

        self.cache_data_url(&host);
        Ok(self.cached_data_url().unwrap_or(host))
    }

    async fn create_index(&self, dims: usize) -> Result<String> {
        if dims == 0 {
            bail!("Cannot create index with zero embedding dimension");
        }
        info!(index = %self.index_name, dims, "creating Pinecone index");

        let url = format!("{}/indexes", self.config.control_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "name": self.index_name,
            "dimension": dims,
            "metric": "cosine",
            "spec": {
                "serverless": { "cloud": "aws", "region": "us-east-1" }
            },
            "deletion_protection": "disabled",
        });

        let json = post_json_with_retry(
            &self.client,
            &url,
            &[("Api-Key", self.api_key.as_str())],
            &body,
            self.config.max_retries,
        )
        .await?;

        json.get("host")
            .and_then(|h| h.as_str())
            .map(|h| h.to_string())
            .ok_or_else(|| anyhow::anyhow!("create index response is missing host"))
    }

    async fn data_post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let base = self.resolve_data_url(None).await?;
        post_json_with_retry(
            &self.client,
            &format!("{}{}", base, path),
            &[("Api-Key", self.api_key.as_str())],
            body,
            self.config.max_retries,
        )
        .await
    }

    /// List all vector IDs with the given prefix, following pagination.
    async fn list_ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let base = self.resolve_data_url(None).await?;
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        let url = format!("{}/vectors/list", base);
        loop {
            // Pagination tokens are base64; reqwest percent-encodes them.
            let mut query = vec![
                ("namespace", self.config.namespace.as_str()),
                ("prefix", prefix),
                ("limit", "100"),
            ];
            if let Some(t) = &token {
                query.push(("paginationToken", t.as_str()));
            }

            let (status, json) = get_json(
                &self.client,
                &url,
                &[("Api-Key", self.api_key.as_str())],
                &query,
            )
            .await?;
            if status != 200 {
                bail!("Pinecone list vectors returned {}: {}", status, json);
            }

            if let Some(vectors) = json.get("vectors").and_then(|v| v.as_array()) {
                for v in vectors {
                    if let Some(id) = v.get("id").and_then(|i| i.as_str()) {
                        ids.push(id.to_string());
                    }
                }
            }

            token = json
                .get("pagination")
                .and_then(|p| p.get("next"))
                .and_then(|n| n.as_str())
                .map(|n| n.to_string());
            if token.is_none() {
                break;
            }
        }

        Ok(ids)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_ready(&self, dims: usize) -> Result<()> {
        self.resolve_data_url(Some(dims)).await?;
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        for batch in records.chunks(self.config.upsert_batch_size) {
            let vectors: Vec<serde_json::Value> = batch
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id,
                        "values": r.values,
                        "metadata": r.metadata,
                    })
                })
                .collect();

            let body = serde_json::json!({
                "vectors": vectors,
                "namespace": self.config.namespace,
            });
            self.data_post("/vectors/upsert", &body).await?;
        }
        Ok(())
    }

    async fn delete_by_source(&self, source: &str) -> Result<()> {
        let prefix = format!("{}-", source_digest(source));
        let ids = self.list_ids_with_prefix(&prefix).await?;
        if ids.is_empty() {
            return Ok(());
        }
        info!(source, count = ids.len(), "deleting stale vectors");

        for batch in ids.chunks(1000) {
            let body = serde_json::json!({
                "ids": batch,
                "namespace": self.config.namespace,
            });
            self.data_post("/vectors/delete", &body).await?;
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "namespace": self.config.namespace,
        });
        let json = self.data_post("/query", &body).await?;

        let matches = json
            .get("matches")
            .and_then(|m| m.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::with_capacity(matches.len());
        for m in matches {
            let id = m
                .get("id")
                .and_then(|i| i.as_str())
                .unwrap_or_default()
                .to_string();
            let score = m.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
            let metadata: ChunkMetadata = match m.get("metadata") {
                Some(value) => serde_json::from_value(value.clone())
                    .with_context(|| format!("malformed metadata on match {}", id))?,
                None => bail!("query match {} has no metadata", id),
            };
            results.push(QueryMatch {
                id,
                score,
                metadata,
            });
        }
        Ok(results)
    }
}
