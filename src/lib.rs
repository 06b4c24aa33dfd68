//! # Ragdex
//!
//! A retrieval-augmented question answering tool for local documents.
//!
//! Ragdex reads plain text, Markdown, PDF, Word, and CSV files, splits them
//! into overlapping chunks, embeds each chunk, and stores the vectors in a
//! hosted Pinecone index. Questions are answered by retrieving the closest
//! chunks and prompting a locally running LLM (Ollama) with them.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────┐
//! │  Loader   │──▶│   Pipeline    │──▶│ Pinecone  │
//! │ txt/pdf/… │   │ Chunk+Embed  │   │  (REST)   │
//! └───────────┘   └──────────────┘   └─────┬─────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │  search  │       │  query   │
//!                 │ (ranked) │       │ (Ollama) │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export PINECONE_API_KEY=...
//! export PINECONE_INDEX_NAME=my-docs
//! ragdex index ./docs --recursive   # chunk, embed, upload
//! ragdex search "refund policy"     # ranked chunks, no LLM
//! ragdex query                      # interactive Q&A loop
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`loader`] | File discovery and per-format loading |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`chunk`] | Overlapping text chunking and chunk IDs |
//! | [`embedding`] | Embedding provider clients (OpenAI, Ollama) |
//! | [`http`] | Shared JSON request/retry plumbing |
//! | [`store`] | Vector store abstraction |
//! | [`pinecone`] | Pinecone REST backend |
//! | [`llm`] | Ollama answer generation |
//! | [`index_cmd`] | The `index` command pipeline |
//! | [`query_cmd`] | The `query` and `search` commands |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod index_cmd;
pub mod llm;
pub mod loader;
pub mod models;
pub mod pinecone;
pub mod query_cmd;
pub mod store;
