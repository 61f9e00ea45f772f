use thiserror::Error;

/// Error taxonomy for the RAG pipeline.
///
/// Transient provider failures (`EmbeddingUnavailable`, `GenerationUnavailable`)
/// may be retried by the caller with its own backoff policy; the ports never
/// retry internally. `InvalidInput` and `GenerationRejected` are fatal and
/// must not be retried.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("generation provider unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("generation rejected: {0}")]
    GenerationRejected(String),
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    /// Whether the caller may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingUnavailable(_) | RagError::GenerationUnavailable(_)
        )
    }
}
