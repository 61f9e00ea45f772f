//! Engine configuration.
//!
//! `RagConfig` carries every tunable the pipeline reads. It can be built
//! programmatically, taken from `Default`, or loaded from a YAML file the
//! same way the rest of the deployment's config files are handled.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Directory where per-session snapshots are written.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// Expected embedding dimensionality. Documents with a different
    /// dimensionality are rejected by the store.
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    /// Default number of snippets retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Conversation-history window: messages beyond the most recent N are
    /// dropped (not summarized) when building the prompt.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
    /// Raw content items with fewer characters than this are skipped by the
    /// indexer.
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
    /// Input text is truncated to this many characters before an embedding
    /// call.
    #[serde(default = "default_max_embed_chars")]
    pub max_embed_chars: usize,
    /// Sampling temperature passed to the generation provider.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Token cap passed to the generation provider.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("data/knowledge")
}

fn default_embedding_dims() -> usize {
    1536
}

fn default_top_k() -> usize {
    5
}

fn default_max_history_messages() -> usize {
    10
}

fn default_min_text_len() -> usize {
    10
}

fn default_max_embed_chars() -> usize {
    8000
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    150
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            embedding_dims: default_embedding_dims(),
            top_k: default_top_k(),
            max_history_messages: default_max_history_messages(),
            min_text_len: default_min_text_len(),
            max_embed_chars: default_max_embed_chars(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl RagConfig {
    /// Load configuration from a YAML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(RagError::internal)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents)
            .map_err(|e| RagError::internal(format!("failed to parse {}: {e}", path.display())))
    }
}
