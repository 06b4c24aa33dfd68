//! Embedding providers.
//!
//! Two backends are supported, selected by `embedding.provider` in config:
//! - **openai** — `POST /v1/embeddings`, authenticated with `OPENAI_API_KEY`.
//! - **ollama** — `POST /api/embed` on a local Ollama instance.
//!
//! Both batch their inputs and share the retry/backoff policy in
//! [`crate::http`]. Vectors come back in input order.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::http::post_json_with_retry;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// A configured embedding backend.
pub struct Embedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl Embedder {
    /// Build an embedder from config. For the OpenAI provider this verifies
    /// `OPENAI_API_KEY` up front so a misconfigured run fails before any
    /// files are loaded.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = match config.provider.as_str() {
            "openai" => match std::env::var("OPENAI_API_KEY") {
                Ok(key) => Some(key),
                Err(_) => bail!("OPENAI_API_KEY environment variable not set"),
            },
            "ollama" => None,
            other => bail!("Unknown embedding provider: {}", other),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: config.clone(),
            client,
            api_key,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Embed a batch of texts, one vector per input, in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self.config.provider.as_str() {
            "openai" => self.embed_openai(texts).await,
            "ollama" => self.embed_ollama(texts).await,
            other => bail!("Unknown embedding provider: {}", other),
        }
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;
        let url = self
            .config
            .url
            .clone()
            .unwrap_or_else(|| OPENAI_EMBEDDINGS_URL.to_string());

        let body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });
        let auth = format!("Bearer {}", api_key);

        let json = post_json_with_retry(
            &self.client,
            &url,
            &[("Authorization", auth.as_str())],
            &body,
            self.config.max_retries,
        )
        .await?;

        let data = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            vectors.push(parse_vector(item.get("embedding"))?);
        }
        if vectors.len() != texts.len() {
            bail!(
                "OpenAI returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            );
        }
        Ok(vectors)
    }

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self
            .config
            .url
            .as_deref()
            .unwrap_or("http://localhost:11434");
        let url = format!("{}/api/embed", base.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });

        let json = post_json_with_retry(&self.client, &url, &[], &body, self.config.max_retries)
            .await
            .map_err(|e| anyhow::anyhow!("Ollama embedding failed (is Ollama running at {}?): {}", base, e))?;

        let embeddings = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

        let mut vectors = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            vectors.push(parse_vector(Some(embedding))?);
        }
        Ok(vectors)
    }
}

fn parse_vector(value: Option<&serde_json::Value>) -> Result<Vec<f32>> {
    let array = value
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: missing vector"))?;
    Ok(array
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty or mismatched
/// lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn openai_config(url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            batch_size: 64,
            max_retries: 1,
            timeout_secs: 5,
            url: Some(url.to_string()),
        }
    }

    fn ollama_config(url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            batch_size: 64,
            max_retries: 0,
            timeout_secs: 5,
            url: Some(url.to_string()),
        }
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_empty_or_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn openai_batch_parses_vectors_in_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("Authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "text-embedding-3-small"}"#);
                then.status(200).json_body(serde_json::json!({
                    "data": [
                        {"index": 0, "embedding": [0.1, 0.2]},
                        {"index": 1, "embedding": [0.3, 0.4]}
                    ]
                }));
            })
            .await;

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let config = openai_config(&format!("{}/v1/embeddings", server.base_url()));
        let embedder = Embedder::new(&config).unwrap();
        let vectors = embedder
            .embed_batch(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn openai_retries_on_server_error() {
        let server = MockServer::start_async().await;
        let failing = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(500).body("boom");
            })
            .await;

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let config = openai_config(&format!("{}/v1/embeddings", server.base_url()));
        let embedder = Embedder::new(&config).unwrap();
        let err = embedder
            .embed_batch(&["alpha".to_string()])
            .await
            .unwrap_err();

        // max_retries = 1 means two attempts total.
        assert_eq!(failing.hits_async().await, 2);
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn ollama_parses_embeddings_array() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(200).json_body(serde_json::json!({
                    "embeddings": [[1.0, 0.0, 0.5]]
                }));
            })
            .await;

        let config = ollama_config(&server.base_url());
        let embedder = Embedder::new(&config).unwrap();
        let vector = embedder.embed_query("question").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0, 0.5]);
    }

    #[tokio::test]
    async fn empty_batch_short_circuits() {
        let config = ollama_config("http://localhost:1");
        let embedder = Embedder::new(&config).unwrap();
        let vectors = embedder.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
