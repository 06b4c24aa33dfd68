//! `query` and `search` commands: retrieval over the indexed corpus.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use tracing::debug;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::llm::{self, LlmClient};
use crate::models::QueryMatch;
use crate::pinecone::PineconeStore;
use crate::store::VectorStore;

/// Interactive question loop: embed the question, retrieve the closest
/// chunks, and ask the local LLM to answer from them. `exit` (or EOF) quits.
pub async fn run_query(config: &Config, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let embedder = Embedder::new(&config.embedding)?;
    let store = PineconeStore::new(&config.pinecone)?;
    let llm_client = LlmClient::new(&config.llm)?;

    println!(
        "Ask questions about your indexed documents ({} answers). Type 'exit' to quit.",
        llm_client.model_name()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        let matches = retrieve(&embedder, &store, question, top_k).await?;
        if matches.is_empty() {
            println!("No indexed content matched. Run `ragdex index <path>` first.\n");
            continue;
        }

        println!("Thinking...");
        let context = llm::assemble_context(&matches);
        let answer = llm_client.answer(&context, question).await?;
        println!("{}\n", answer);
    }
    Ok(())
}

/// One-shot retrieval without the LLM: print the ranked chunks directly.
pub async fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let embedder = Embedder::new(&config.embedding)?;
    let store = PineconeStore::new(&config.pinecone)?;

    let matches = retrieve(&embedder, &store, query, top_k).await?;
    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, m) in matches.iter().enumerate() {
        let location = match (m.metadata.page, m.metadata.row) {
            (Some(page), _) => format!("{} p.{}", m.metadata.source, page),
            (None, Some(row)) => format!("{} row {}", m.metadata.source, row),
            (None, None) => m.metadata.source.clone(),
        };
        println!("{}. [{:.4}] {}", rank + 1, m.score, location);
        println!("   {}", excerpt(&m.metadata.text, 200));
    }
    Ok(())
}

async fn retrieve(
    embedder: &Embedder,
    store: &dyn VectorStore,
    query: &str,
    top_k: usize,
) -> Result<Vec<QueryMatch>> {
    let vector = embedder.embed_query(query).await?;
    let matches = store.query(&vector, top_k).await?;
    debug!(query = %query, matches = matches.len(), "retrieved");
    Ok(matches)
}

/// First `max_chars` of a chunk with newlines flattened, for list output.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_flattens_whitespace() {
        assert_eq!(excerpt("a\nb\t c", 100), "a b c");
    }

    #[test]
    fn excerpt_truncates_long_text() {
        let text = "word ".repeat(100);
        let short = excerpt(&text, 20);
        assert!(short.ends_with("..."));
        assert!(short.chars().count() <= 23);
    }
}
