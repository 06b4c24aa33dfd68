//! # Ragdex CLI (`ragdex`)
//!
//! The `ragdex` binary indexes local documents into a Pinecone vector index
//! and answers questions about them with a locally running LLM.
//!
//! ## Usage
//!
//! ```bash
//! ragdex --config ./config/ragdex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragdex index <path>` | Extract, chunk, embed, and upload documents |
//! | `ragdex search "<query>"` | Print the closest indexed chunks |
//! | `ragdex query` | Interactive question-answering loop |
//!
//! ## Examples
//!
//! ```bash
//! # Index a single file
//! ragdex index ./notes.md
//!
//! # Index a directory tree
//! ragdex index ./docs --recursive
//!
//! # See what would be indexed without calling any API
//! ragdex index ./docs --recursive --dry-run
//!
//! # Retrieval only, no LLM
//! ragdex search "refund policy" --top-k 3
//!
//! # Interactive Q&A (requires Ollama)
//! ragdex query
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ragdex::index_cmd::{self, IndexOptions};
use ragdex::{config, query_cmd};

/// Ragdex — retrieval-augmented question answering over local documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ragdex.example.toml` for a full example. Pinecone
/// credentials come from `PINECONE_API_KEY` and `PINECONE_INDEX_NAME`.
#[derive(Parser)]
#[command(
    name = "ragdex",
    about = "Index local documents into Pinecone and answer questions about them",
    version,
    long_about = "Ragdex reads plain text, Markdown, PDF, Word, and CSV files, chunks and \
    embeds them, and syncs the vectors into a hosted Pinecone index. Questions are answered \
    by retrieving the closest chunks and prompting a locally running LLM (Ollama) with them."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ragdex.toml`. Missing file means built-in
    /// defaults; chunking, embedding, Pinecone, and LLM settings are all
    /// read from here.
    #[arg(long, global = true, default_value = "./config/ragdex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Index a file or directory into the vector store.
    ///
    /// Extracts text, splits it into overlapping chunks, embeds each chunk,
    /// and uploads the vectors. Re-indexing a file first deletes its old
    /// vectors, so stale chunks never survive an update.
    Index {
        /// File or directory to index.
        path: PathBuf,

        /// Descend into subdirectories. Without this flag only the top
        /// level of a directory is scanned.
        #[arg(long, short)]
        recursive: bool,

        /// Show file, document, and chunk counts without calling any API.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask questions interactively.
    ///
    /// Reads questions from stdin, retrieves the closest chunks from the
    /// index, and answers with the configured local LLM. Type `exit` to quit.
    Query {
        /// Number of chunks to retrieve per question.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print the closest indexed chunks for a query, without the LLM.
    ///
    /// Useful for checking what the index contains and what `query` would
    /// feed into the model.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index {
            path,
            recursive,
            dry_run,
            limit,
        } => {
            let options = IndexOptions {
                recursive,
                dry_run,
                limit,
            };
            index_cmd::run_index(&cfg, &path, &options).await?;
        }
        Commands::Query { top_k } => {
            query_cmd::run_query(&cfg, top_k).await?;
        }
        Commands::Search { query, top_k } => {
            query_cmd::run_search(&cfg, &query, top_k).await?;
        }
    }

    Ok(())
}
