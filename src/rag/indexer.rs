//! One-time embedding of raw scraped content into a `VectorStore`.
//!
//! The indexer is tolerant of per-item failures: one item whose embedding
//! call fails is logged, counted, and skipped, and never aborts the batch.
//! It is also cache-aware: a non-empty store is a cache hit and indexing is
//! a no-op unless the caller explicitly requests a rebuild, which bounds
//! embedding-service cost across repeated session access.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use sha2::{Digest, Sha256};

use super::document::{Document, RawContent};
use super::store::VectorStore;
use crate::core::errors::RagError;
use crate::llm::provider::EmbeddingProvider;

/// How many normalized characters participate in the dedup signature.
const SIGNATURE_PREFIX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOutcome {
    /// Documents embedded and added to the store.
    pub added: usize,
    /// Items whose embedding call failed.
    pub failed: usize,
    /// Items skipped before embedding (too short, duplicate, cache hit).
    pub skipped: usize,
}

pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    min_text_len: usize,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, min_text_len: usize) -> Self {
        Self {
            embedder,
            min_text_len,
        }
    }

    /// Embed `items` into `store` and persist the result.
    ///
    /// Returns without touching the store when it is already populated and
    /// `rebuild` is false. Persists the store only when at least one
    /// document was added.
    pub async fn index(
        &self,
        store: &mut VectorStore,
        items: Vec<RawContent>,
        rebuild: bool,
    ) -> Result<IndexOutcome, RagError> {
        if !store.is_empty() && !rebuild {
            tracing::debug!(
                session_id = %store.session_id(),
                documents = store.len(),
                "store already indexed, skipping"
            );
            return Ok(IndexOutcome {
                skipped: items.len(),
                ..Default::default()
            });
        }
        if rebuild {
            store.clear();
        }

        let mut seen: HashSet<String> = store
            .documents()
            .iter()
            .map(|doc| dedup_signature(&doc.text, doc.metadata.topic.as_deref()))
            .collect();

        let mut outcome = IndexOutcome::default();

        for item in items {
            let text = normalize_text(&item.text);
            if text.chars().count() < self.min_text_len {
                outcome.skipped += 1;
                continue;
            }

            let signature = dedup_signature(&text, item.topic.as_deref());
            if !seen.insert(signature) {
                outcome.skipped += 1;
                continue;
            }

            let embedding = match self.embedder.embed(&text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    tracing::warn!(
                        session_id = %store.session_id(),
                        url = item.url.as_deref().unwrap_or(""),
                        error = %e,
                        "failed to embed content item, continuing"
                    );
                    outcome.failed += 1;
                    continue;
                }
            };

            let document = Document {
                id: uuid::Uuid::new_v4().to_string(),
                text,
                metadata: item.into_metadata(),
                embedding,
            };
            // A store rejection (e.g. a provider returning a vector of the
            // wrong dimensionality) is a per-item failure like any other.
            if let Err(e) = store.add(document) {
                tracing::warn!(
                    session_id = %store.session_id(),
                    error = %e,
                    "failed to store embedded item, continuing"
                );
                outcome.failed += 1;
                continue;
            }
            outcome.added += 1;
        }

        if outcome.added > 0 {
            store.save().await?;
        }

        tracing::info!(
            session_id = %store.session_id(),
            added = outcome.added,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "indexed session content"
        );
        Ok(outcome)
    }
}

/// Collapse runs of whitespace and trim.
pub fn normalize_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(text.trim(), " ").into_owned()
}

/// Signature over the normalized text prefix and topic, used to drop
/// near-duplicate scraped items before paying for an embedding call.
fn dedup_signature(normalized_text: &str, topic: Option<&str>) -> String {
    let prefix: String = normalized_text.chars().take(SIGNATURE_PREFIX_CHARS).collect();
    let mut hasher = Sha256::new();
    hasher.update(prefix.to_lowercase());
    hasher.update(b"|");
    hasher.update(topic.unwrap_or("").to_lowercase());
    hex::encode(hasher.finalize())
}
