//! Shared JSON-over-HTTP plumbing for the embedding and Pinecone clients.
//!
//! Retry policy: HTTP 429 and 5xx and network errors are retried with
//! exponential backoff (1s, 2s, 4s, ... capped at 32s); any other 4xx fails
//! immediately with the response body in the error.

use anyhow::{bail, Result};
use std::time::Duration;

/// POST a JSON body and return the parsed JSON response, retrying transient
/// failures up to `max_retries` times.
///
/// `headers` are (name, value) pairs added to every attempt.
pub async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        match request.json(body).send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    // A truncated body on a 2xx is as transient as a failed
                    // send; retry it the same way.
                    match response.json().await {
                        Ok(json) => return Ok(json),
                        Err(e) => {
                            last_err = Some(anyhow::anyhow!(
                                "reading response from {} failed: {}",
                                url,
                                e
                            ));
                            continue;
                        }
                    }
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(anyhow::anyhow!("{} returned {}: {}", url, status, body_text));
                    continue;
                }

                bail!("{} returned {}: {}", url, status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!("request to {} failed: {}", url, e));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("request to {} failed after retries", url)))
}

/// GET a URL and return `(status, parsed JSON)`. Used by the Pinecone
/// control and data planes where a 404 is a meaningful answer, not an error.
///
/// `query` pairs are percent-encoded by reqwest; Pinecone pagination tokens
/// are base64 and must not be spliced into the URL by hand.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
    query: &[(&str, &str)],
) -> Result<(u16, serde_json::Value)> {
    let mut request = client.get(url);
    if !query.is_empty() {
        request = request.query(query);
    }
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.send().await?;
    let status = response.status().as_u16();
    let json = response
        .json()
        .await
        .unwrap_or(serde_json::Value::Null);
    Ok((status, json))
}
