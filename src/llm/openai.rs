use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, GenerationProvider};
use super::types::GenerationRequest;
use crate::core::errors::RagError;

/// Embedding and generation ports backed by an OpenAI-compatible API.
///
/// Works against api.openai.com as well as local servers exposing the same
/// `/v1/embeddings` and `/v1/chat/completions` surface.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    embedding_dims: usize,
    max_embed_chars: usize,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        embedding_model: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_dims: usize,
        max_embed_chars: usize,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embedding_model: embedding_model.into(),
            chat_model: chat_model.into(),
            embedding_dims,
            max_embed_chars,
            client: Client::new(),
        }
    }

    /// Truncate to the provider's accepted input size on a char boundary.
    fn truncate_input<'a>(&self, text: &'a str) -> &'a str {
        if text.chars().count() <= self.max_embed_chars {
            return text;
        }
        match text.char_indices().nth(self.max_embed_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.embedding_dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RagError::InvalidInput("cannot embed empty text".to_string()));
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.embedding_model,
            "input": self.truncate_input(trimmed),
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingUnavailable(format!(
                "embedding request failed ({status}): {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(e.to_string()))?;

        let embedding: Vec<f32> = payload["data"][0]["embedding"]
            .as_array()
            .map(|vals| {
                vals.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect()
            })
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(RagError::EmbeddingUnavailable(
                "embedding response carried no vector".to_string(),
            ));
        }

        Ok(embedding)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "stream": false,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(m) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(m));
            }
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::GenerationUnavailable(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            // 4xx means the request itself was refused (validation, content
            // policy, bad model); retrying the same prompt cannot succeed.
            if status.is_client_error() {
                return Err(RagError::GenerationRejected(format!(
                    "generation rejected ({status}): {text}"
                )));
            }
            return Err(RagError::GenerationUnavailable(format!(
                "generation request failed ({status}): {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| RagError::GenerationUnavailable(e.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if content.is_empty() {
            return Err(RagError::GenerationUnavailable(
                "generation response carried no content".to_string(),
            ));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(max_embed_chars: usize) -> OpenAiProvider {
        OpenAiProvider::new(
            "http://localhost:9999/",
            "test-key",
            "text-embedding-3-small",
            "gpt-4",
            1536,
            max_embed_chars,
        )
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let p = provider(100);
        assert_eq!(p.base_url, "http://localhost:9999");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let p = provider(3);
        assert_eq!(p.truncate_input("日本語のテキスト"), "日本語");
        assert_eq!(p.truncate_input("ab"), "ab");
    }

    #[tokio::test]
    async fn embed_rejects_empty_input_without_network() {
        let p = provider(100);
        let err = p.embed("   ").await.unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
    }
}
