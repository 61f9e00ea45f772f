//! Per-session vector store.
//!
//! An ordered, deduplicated collection of embedded documents with whole-set
//! JSON snapshots on disk. Similarity search is brute-force cosine over every
//! stored embedding — O(N·d) per query, which is the intended design for the
//! small per-session corpora this engine serves (tens to low hundreds of
//! documents). There is no autosave: the in-memory set and the last snapshot
//! may diverge until `save()` is called.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{Document, RetrievalResult};
use crate::core::errors::RagError;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    session_id: String,
    saved_at: DateTime<Utc>,
    documents: Vec<Document>,
}

#[derive(Debug)]
pub struct VectorStore {
    session_id: String,
    snapshot_path: PathBuf,
    documents: Vec<Document>,
}

impl VectorStore {
    pub fn new(session_id: impl Into<String>, snapshot_dir: &Path) -> Self {
        let session_id = session_id.into();
        let snapshot_path = snapshot_dir.join(format!("{}.json", sanitize_id(&session_id)));
        Self {
            session_id,
            snapshot_path,
            documents: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Whether a document with this id is already stored.
    pub fn contains(&self, id: &str) -> bool {
        self.documents.iter().any(|d| d.id == id)
    }

    /// Append a document. Duplicate ids are rejected; use `upsert` when the
    /// caller explicitly intends to overwrite.
    pub fn add(&mut self, document: Document) -> Result<(), RagError> {
        self.validate(&document)?;
        if self.contains(&document.id) {
            return Err(RagError::InvalidInput(format!(
                "duplicate document id: {}",
                document.id
            )));
        }
        self.documents.push(document);
        Ok(())
    }

    /// Insert or overwrite a document in place.
    pub fn upsert(&mut self, document: Document) -> Result<(), RagError> {
        self.validate(&document)?;
        if let Some(existing) = self.documents.iter_mut().find(|d| d.id == document.id) {
            *existing = document;
        } else {
            self.documents.push(document);
        }
        Ok(())
    }

    fn validate(&self, document: &Document) -> Result<(), RagError> {
        if document.id.trim().is_empty() {
            return Err(RagError::InvalidInput("document id is empty".to_string()));
        }
        if document.text.trim().is_empty() {
            return Err(RagError::InvalidInput(format!(
                "document {} has empty text",
                document.id
            )));
        }
        if document.embedding.is_empty() {
            return Err(RagError::InvalidInput(format!(
                "document {} has an empty embedding",
                document.id
            )));
        }
        if let Some(first) = self.documents.first() {
            if document.embedding.len() != first.embedding.len() {
                return Err(RagError::InvalidInput(format!(
                    "document {} embedding has {} dimensions, store has {}",
                    document.id,
                    document.embedding.len(),
                    first.embedding.len()
                )));
            }
        }
        Ok(())
    }

    /// Rank every stored document against the query embedding and return the
    /// top `top_k` by cosine similarity. An empty store or `top_k == 0`
    /// yields an empty list, not an error.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<RetrievalResult> {
        if top_k == 0 || self.documents.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<RetrievalResult> = self
            .documents
            .iter()
            .map(|doc| RetrievalResult {
                document: doc.clone(),
                score: cosine_similarity(query_embedding, &doc.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        scored.truncate(top_k);
        scored
    }

    /// Write the full document set to the per-session snapshot file,
    /// replacing whatever was there.
    pub async fn save(&self) -> Result<(), RagError> {
        if let Some(parent) = self.snapshot_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(RagError::internal)?;
        }

        let snapshot = Snapshot {
            session_id: self.session_id.clone(),
            saved_at: Utc::now(),
            documents: self.documents.clone(),
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(RagError::internal)?;

        tokio::fs::write(&self.snapshot_path, bytes)
            .await
            .map_err(RagError::internal)?;

        tracing::debug!(
            session_id = %self.session_id,
            documents = self.documents.len(),
            "saved knowledge snapshot"
        );
        Ok(())
    }

    /// Replace the in-memory set with the persisted snapshot.
    ///
    /// A missing, corrupted, or unparsable snapshot is treated as an empty
    /// store (logged, never raised) so the caller can re-index. Entries that
    /// fail validation are dropped with a warning.
    pub async fn load(&mut self) -> Result<usize, RagError> {
        self.documents.clear();

        let bytes = match tokio::fs::read(&self.snapshot_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(RagError::internal(e)),
        };

        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    path = %self.snapshot_path.display(),
                    error = %e,
                    "knowledge snapshot is corrupted, treating as empty"
                );
                return Ok(0);
            }
        };

        for document in snapshot.documents {
            let id = document.id.clone();
            if let Err(e) = self.add(document) {
                tracing::warn!(
                    session_id = %self.session_id,
                    document_id = %id,
                    error = %e,
                    "dropping invalid snapshot entry"
                );
            }
        }

        Ok(self.documents.len())
    }
}

/// Cosine similarity clamped to `[-1, 1]`. Mismatched or zero-norm vectors
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

fn sanitize_id(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::document::DocumentMetadata;

    fn doc(id: &str, text: &str, embedding: Vec<f32>) -> Document {
        Document {
            id: id.to_string(),
            text: text.to_string(),
            metadata: DocumentMetadata::default(),
            embedding,
        }
    }

    fn store() -> VectorStore {
        VectorStore::new("s1", Path::new("/tmp/persona-rag-unused"))
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut store = store();
        store.add(doc("a", "first", vec![1.0, 0.0])).unwrap();
        let err = store.add(doc("a", "second", vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let mut store = store();
        store.add(doc("a", "first", vec![1.0, 0.0])).unwrap();
        store.upsert(doc("a", "second", vec![0.0, 1.0])).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.documents()[0].text, "second");
    }

    #[test]
    fn add_rejects_dimension_mismatch() {
        let mut store = store();
        store.add(doc("a", "first", vec![1.0, 0.0])).unwrap();
        let err = store.add(doc("b", "second", vec![1.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
    }

    #[test]
    fn search_ranks_by_cosine_with_worked_example() {
        let mut store = store();
        store.add(doc("a", "east", vec![1.0, 0.0])).unwrap();
        store.add(doc("b", "north", vec![0.0, 1.0])).unwrap();
        store.add(doc("c", "northeast", vec![0.7, 0.7])).unwrap();

        let results = store.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].document.id, "c");
        assert!((results[1].score - 0.707).abs() < 1e-3);
    }

    #[test]
    fn search_breaks_ties_by_ascending_id() {
        let mut store = store();
        store.add(doc("b", "two", vec![1.0, 0.0])).unwrap();
        store.add(doc("a", "one", vec![1.0, 0.0])).unwrap();

        let results = store.search(&[1.0, 0.0], 2);
        assert_eq!(results[0].document.id, "a");
        assert_eq!(results[1].document.id, "b");
    }

    #[test]
    fn search_is_bounded_and_handles_degenerate_input() {
        let mut store = store();
        assert!(store.search(&[1.0, 0.0], 5).is_empty());

        store.add(doc("a", "only", vec![1.0, 0.0])).unwrap();
        assert_eq!(store.search(&[1.0, 0.0], 10).len(), 1);
        assert!(store.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn cosine_handles_zero_and_mismatched_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn save_load_round_trips_documents_and_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::new("round-trip", dir.path());
        store.add(doc("a", "alpha", vec![0.25, -0.5, 0.125])).unwrap();
        store.add(doc("b", "beta", vec![0.0, 1.0, 0.0])).unwrap();
        store.save().await.unwrap();

        let mut loaded = VectorStore::new("round-trip", dir.path());
        let count = loaded.load().await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(loaded.documents()[0].id, "a");
        assert_eq!(loaded.documents()[0].embedding, vec![0.25, -0.5, 0.125]);
        assert_eq!(loaded.documents()[1].text, "beta");
    }

    #[tokio::test]
    async fn load_treats_corrupted_snapshot_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::new("bad", dir.path());
        tokio::fs::write(store.snapshot_path(), b"{ not json ]")
            .await
            .unwrap();

        let count = store.load().await.unwrap();
        assert_eq!(count, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_drops_invalid_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::new("partial", dir.path());

        let raw = serde_json::json!({
            "session_id": "partial",
            "saved_at": "2024-01-01T00:00:00Z",
            "documents": [
                { "id": "good", "text": "kept", "embedding": [1.0, 0.0] },
                { "id": "empty", "text": "   ", "embedding": [0.0, 1.0] },
                { "id": "good", "text": "duplicate id", "embedding": [0.0, 1.0] }
            ]
        });
        tokio::fs::write(store.snapshot_path(), raw.to_string())
            .await
            .unwrap();

        let count = store.load().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.documents()[0].id, "good");
        assert_eq!(store.documents()[0].text, "kept");
    }

    #[test]
    fn snapshot_path_is_sanitized() {
        let store = VectorStore::new("../evil/../id", Path::new("/data"));
        let name = store.snapshot_path().file_name().unwrap().to_string_lossy();
        assert_eq!(name, "---evil----id.json");
    }
}
