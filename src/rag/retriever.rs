//! Query-time retrieval: embed the question, rank the store.

use std::sync::Arc;

use super::document::RetrievalResult;
use super::store::VectorStore;
use crate::core::errors::RagError;
use crate::llm::provider::EmbeddingProvider;

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    /// Embed `question` and return the store's top `top_k` documents.
    ///
    /// A failed question embedding surfaces as `RetrievalUnavailable` —
    /// there is no degraded mode at this layer; fallback policy belongs to
    /// the orchestrator's caller.
    pub async fn retrieve(
        &self,
        store: &VectorStore,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, RagError> {
        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| RagError::RetrievalUnavailable(e.to_string()))?;

        Ok(store.search(&query_embedding, top_k))
    }
}
