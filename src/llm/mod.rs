//! Provider ports for the external embedding and generation services.

pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{EmbeddingProvider, GenerationProvider};
pub use types::{ChatMessage, GenerationRequest};
