use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub pinecone: PineconeConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1000,
            overlap_chars: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"openai"` or `"ollama"`.
    pub provider: String,
    pub model: String,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider; the OpenAI endpoint can also be
    /// overridden here (used by tests).
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "tinyllama".to_string(),
            url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PineconeConfig {
    pub namespace: String,
    pub upsert_batch_size: usize,
    /// Control-plane base URL. Overridable for tests.
    pub control_url: String,
    /// Index name; normally supplied via `PINECONE_INDEX_NAME`.
    pub index: Option<String>,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            namespace: "__default__".to_string(),
            upsert_batch_size: 100,
            control_url: "https://api.pinecone.io".to_string(),
            index: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

impl PineconeConfig {
    /// Resolve the index name: config value or `PINECONE_INDEX_NAME`.
    pub fn index_name(&self) -> Result<String> {
        if let Some(name) = &self.index {
            return Ok(name.clone());
        }
        std::env::var("PINECONE_INDEX_NAME")
            .context("PINECONE_INDEX_NAME environment variable not set")
    }
}

/// Load configuration from a TOML file. A missing file is not an error:
/// every setting has a default, matching a bare `ragdex` install.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_chars == 0 {
        anyhow::bail!("chunking.chunk_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.chunk_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunk_chars");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    if config.pinecone.upsert_batch_size == 0 {
        anyhow::bail!("pinecone.upsert_batch_size must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/ragdex.toml")).unwrap();
        assert_eq!(config.chunking.chunk_chars, 1000);
        assert_eq!(config.chunking.overlap_chars, 100);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.pinecone.namespace, "__default__");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragdex.toml");
        std::fs::write(&path, "[chunking]\nchunk_chars = 400\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.chunk_chars, 400);
        assert_eq!(config.chunking.overlap_chars, 100);
        assert_eq!(config.llm.model, "tinyllama");
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragdex.toml");
        std::fs::write(&path, "[chunking]\nchunk_chars = 100\noverlap_chars = 100\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_unknown_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragdex.toml");
        std::fs::write(&path, "[embedding]\nprovider = \"cohere\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
