//! persona-rag: per-session retrieval-augmented generation for persona chat.
//!
//! Turns a bundle of scraped textual evidence about a person into a
//! queryable knowledge base, retrieves the snippets most relevant to an
//! incoming question, and assembles a grounded, citation-bearing prompt for
//! an external text-generation service.
//!
//! Scraping, persona synthesis, speech, and transport live elsewhere; this
//! crate consumes their outputs through the `ContentSource`,
//! `EmbeddingProvider`, and `GenerationProvider` ports.

pub mod core;
pub mod llm;
pub mod logging;
pub mod rag;

pub use crate::core::config::RagConfig;
pub use crate::core::errors::RagError;
pub use llm::{ChatMessage, EmbeddingProvider, GenerationProvider, GenerationRequest, OpenAiProvider};
pub use rag::{
    ContentSource, Document, DocumentMetadata, IndexOutcome, IndexState, QueryOptions,
    QueryResponse, RagEngine, RawContent, RetrievalResult, SessionHandle, VectorStore,
};
