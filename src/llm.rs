//! Local LLM answer generation via Ollama.
//!
//! Sends a single non-streaming `POST /api/generate` with a prompt built
//! from the retrieved chunks and the user's question. The model is expected
//! to be pulled already (`ollama pull tinyllama`).

use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::QueryMatch;

pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Generate an answer for `question` grounded in `context`.
    pub async fn answer(&self, context: &str, question: &str) -> Result<String> {
        let url = format!(
            "{}/api/generate",
            self.config.url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": build_prompt(context, question),
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "LLM request failed (is Ollama running at {}?)",
                    self.config.url
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama generate returned {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let answer = json
            .get("response")
            .and_then(|r| r.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))?;
        Ok(answer.trim().to_string())
    }
}

/// Assemble the generation prompt from retrieved context and the question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question based only on the following context:\n{}\n\nQuestion: {}\n",
        context, question
    )
}

/// Join retrieved chunks into LLM context.
///
/// Matches are ordered by (source, page, row, chunk index) so text from the
/// same file reads in document order rather than similarity order.
pub fn assemble_context(matches: &[QueryMatch]) -> String {
    let mut ordered: Vec<&QueryMatch> = matches.iter().collect();
    ordered.sort_by(|a, b| {
        a.metadata
            .source
            .cmp(&b.metadata.source)
            .then_with(|| a.metadata.page.unwrap_or(0).cmp(&b.metadata.page.unwrap_or(0)))
            .then_with(|| a.metadata.row.unwrap_or(0).cmp(&b.metadata.row.unwrap_or(0)))
            .then_with(|| a.metadata.chunk_index.cmp(&b.metadata.chunk_index))
    });

    ordered
        .iter()
        .map(|m| m.metadata.text.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;
    use httpmock::prelude::*;

    fn query_match(source: &str, chunk_index: i64, row: Option<i64>, text: &str) -> QueryMatch {
        QueryMatch {
            id: format!("{}-{}", source, chunk_index),
            score: 0.5,
            metadata: ChunkMetadata {
                source: source.to_string(),
                hash: "h".to_string(),
                chunk_index,
                page: None,
                row,
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let prompt = build_prompt("some context", "what is this?");
        assert!(prompt.starts_with("Answer the question based only on the following context:"));
        assert!(prompt.contains("some context"));
        assert!(prompt.contains("Question: what is this?"));
    }

    #[test]
    fn context_is_document_ordered_not_score_ordered() {
        let matches = vec![
            query_match("b.txt", 1, None, "b one"),
            query_match("a.txt", 2, None, "a two"),
            query_match("b.txt", 0, None, "b zero"),
            query_match("a.txt", 0, None, "a zero"),
        ];
        let context = assemble_context(&matches);
        assert_eq!(context, "a zero\n---\na two\n---\nb zero\n---\nb one");
    }

    #[test]
    fn context_orders_csv_rows_before_chunk_index() {
        let matches = vec![
            query_match("data.csv", 0, Some(3), "row three"),
            query_match("data.csv", 0, Some(1), "row one"),
        ];
        let context = assemble_context(&matches);
        assert_eq!(context, "row one\n---\nrow three");
    }

    #[test]
    fn empty_matches_empty_context() {
        assert_eq!(assemble_context(&[]), "");
    }

    #[tokio::test]
    async fn answer_sends_prompt_and_returns_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{"model": "tinyllama", "stream": false}"#);
                then.status(200).json_body(serde_json::json!({
                    "model": "tinyllama",
                    "response": "  The answer is 42.  ",
                    "done": true
                }));
            })
            .await;

        let config = LlmConfig {
            model: "tinyllama".to_string(),
            url: server.base_url(),
            timeout_secs: 5,
        };
        let client = LlmClient::new(&config).unwrap();
        let answer = client.answer("some context", "what?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "The answer is 42.");
    }

    #[tokio::test]
    async fn answer_surfaces_http_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body("model not found");
            })
            .await;

        let config = LlmConfig {
            model: "tinyllama".to_string(),
            url: server.base_url(),
            timeout_secs: 5,
        };
        let client = LlmClient::new(&config).unwrap();
        let err = client.answer("some context", "what?").await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
