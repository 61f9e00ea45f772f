use async_trait::async_trait;

use super::types::GenerationRequest;
use crate::core::errors::RagError;

/// Port over an external embedding service.
///
/// Implementations must truncate oversized input before calling out and must
/// reject empty input with `RagError::InvalidInput` without a network call.
/// Transient provider failures surface as `RagError::EmbeddingUnavailable`;
/// retry policy belongs to the caller, never to the port.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for diagnostics (e.g. "openai").
    fn name(&self) -> &str;

    /// Embedding dimensionality this provider produces.
    fn dimensions(&self) -> usize;

    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Port over an external text-generation service.
///
/// Provider/network failures surface as `RagError::GenerationUnavailable`
/// (retryable by the caller); content-policy or validation rejections surface
/// as `RagError::GenerationRejected` and must not be retried.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Produce an answer for a composed prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError>;
}
