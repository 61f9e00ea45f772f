//! RAG (Retrieval-Augmented Generation) pipeline.
//!
//! - `VectorStore`: per-session ordered document collection with JSON
//!   snapshots and brute-force cosine search
//! - `Indexer`: embeds raw scraped content, tolerating per-item failures
//! - `Retriever`: embeds a question and ranks the store
//! - `ContextBuilder`: persona + bounded history window + numbered snippets
//! - `RagEngine`: session orchestrator and public entry point

pub mod context_builder;
pub mod document;
pub mod engine;
pub mod indexer;
pub mod retriever;
pub mod store;

pub use context_builder::ContextBuilder;
pub use document::{Document, DocumentMetadata, RawContent, RetrievalResult};
pub use engine::{ContentSource, IndexState, QueryOptions, QueryResponse, RagEngine, SessionHandle};
pub use indexer::{IndexOutcome, Indexer};
pub use retriever::Retriever;
pub use store::VectorStore;
