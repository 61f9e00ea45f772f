//! Session orchestrator: the public entry point of the engine.
//!
//! Owns an explicit registry of per-session slots (store + build lock +
//! index state). Sessions are independent; within one session the
//! unindexed-to-indexing transition is guarded so that exactly one embedding
//! pass runs no matter how many queries race on a cold session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::context_builder::ContextBuilder;
use super::document::{RawContent, RetrievalResult};
use super::indexer::{IndexOutcome, Indexer};
use super::retriever::Retriever;
use super::store::VectorStore;
use crate::core::config::RagConfig;
use crate::core::errors::RagError;
use crate::llm::provider::{EmbeddingProvider, GenerationProvider};
use crate::llm::types::{ChatMessage, GenerationRequest};

/// Collaborator that supplies the raw scraped evidence for a session.
///
/// Scraping happens elsewhere; the engine only consumes its output. A
/// session with no collected data must fail with `SessionNotFound`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, session_id: &str) -> Result<Vec<RawContent>, RagError>;
}

/// Index lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Unindexed,
    Indexing,
    Indexed,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Number of snippets to retrieve; falls back to the configured default.
    pub top_k: Option<usize>,
    /// Persona/system prompt, passed through unmodified.
    pub system_prompt: String,
    /// Conversation history, externally owned. Only a trailing window is
    /// read; it is never stored or mutated here.
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: String,
    /// The snippets that were actually placed in the generation context.
    pub sources: Vec<RetrievalResult>,
}

struct SessionSlot {
    store: RwLock<VectorStore>,
    /// Serializes index builds and snapshot writes for this session.
    build_lock: Mutex<()>,
    state: StdMutex<IndexState>,
}

impl SessionSlot {
    fn new(store: VectorStore) -> Self {
        Self {
            store: RwLock::new(store),
            build_lock: Mutex::new(()),
            state: StdMutex::new(IndexState::Unindexed),
        }
    }

    fn state(&self) -> IndexState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: IndexState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Retrieval-augmented generation engine over per-session knowledge bases.
pub struct RagEngine {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    content: Arc<dyn ContentSource>,
    retriever: Retriever,
    context_builder: ContextBuilder,
    sessions: StdMutex<HashMap<String, Arc<SessionSlot>>>,
}

impl RagEngine {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        content: Arc<dyn ContentSource>,
    ) -> Self {
        if embedder.dimensions() != config.embedding_dims {
            tracing::warn!(
                provider = embedder.name(),
                configured = config.embedding_dims,
                actual = embedder.dimensions(),
                "embedding dimensionality differs from configuration"
            );
        }
        let retriever = Retriever::new(embedder.clone());
        let context_builder = ContextBuilder::new(config.max_history_messages);
        Self {
            config,
            embedder,
            generator,
            content,
            retriever,
            context_builder,
            sessions: StdMutex::new(HashMap::new()),
        }
    }

    /// One-shot query: ensure the session is indexed, retrieve, assemble,
    /// generate. Retrieval and generation failures surface as typed errors
    /// and are never retried or silently degraded here — the caller decides
    /// whether to fall back to `query_without_context`.
    pub async fn query(
        &self,
        session_id: &str,
        question: &str,
        options: QueryOptions,
    ) -> Result<QueryResponse, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question is empty".to_string()));
        }

        let slot = self.slot(session_id);
        self.ensure_indexed(&slot, session_id).await?;

        let top_k = options.top_k.unwrap_or(self.config.top_k);
        let sources = {
            let store = slot.store.read().await;
            self.retriever.retrieve(&store, question, top_k).await?
        };

        let messages =
            self.context_builder
                .build(&options.system_prompt, &options.history, &sources, question);
        let answer = self.generate(messages).await?;

        Ok(QueryResponse { answer, sources })
    }

    /// The explicit fallback path: persona + history + question, no
    /// retrieved context and no indexing. Used by callers when `query`
    /// fails with a retrieval-side error.
    pub async fn query_without_context(
        &self,
        question: &str,
        options: QueryOptions,
    ) -> Result<String, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question is empty".to_string()));
        }

        let messages =
            self.context_builder
                .build_plain(&options.system_prompt, &options.history, question);
        self.generate(messages).await
    }

    /// Open a session for repeated queries without per-call setup.
    pub fn open(&self, session_id: &str) -> SessionHandle<'_> {
        SessionHandle {
            engine: self,
            session_id: session_id.to_string(),
        }
    }

    /// Force a rebuild of the session's knowledge base, replacing the
    /// current document set and snapshot.
    pub async fn reindex(&self, session_id: &str) -> Result<IndexOutcome, RagError> {
        let slot = self.slot(session_id);
        let _guard = slot.build_lock.lock().await;

        slot.set_state(IndexState::Indexing);
        let items = match self.content.fetch(session_id).await {
            Ok(items) => items,
            Err(e) => {
                slot.set_state(IndexState::Unindexed);
                return Err(e);
            }
        };

        let mut store = slot.store.write().await;
        let indexer = Indexer::new(self.embedder.clone(), self.config.min_text_len);
        let outcome = match indexer.index(&mut store, items, true).await {
            Ok(outcome) => outcome,
            Err(e) => {
                slot.set_state(IndexState::Unindexed);
                return Err(e);
            }
        };

        slot.set_state(if store.is_empty() {
            IndexState::Unindexed
        } else {
            IndexState::Indexed
        });
        Ok(outcome)
    }

    /// Current index state of a session (`Unindexed` for unknown sessions).
    pub fn index_state(&self, session_id: &str) -> IndexState {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session_id)
            .map(|slot| slot.state())
            .unwrap_or(IndexState::Unindexed)
    }

    /// Number of documents currently held for a session.
    pub async fn session_size(&self, session_id: &str) -> usize {
        let slot = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.get(session_id).cloned()
        };
        match slot {
            Some(slot) => slot.store.read().await.len(),
            None => 0,
        }
    }

    /// Drop a session's in-memory state. The persisted snapshot stays on
    /// disk and will be loaded again on the next query.
    pub fn evict(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if sessions.remove(session_id).is_some() {
            tracing::debug!(session_id, "evicted session");
        }
    }

    fn slot(&self, session_id: &str) -> Arc<SessionSlot> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                Arc::new(SessionSlot::new(VectorStore::new(
                    session_id,
                    &self.config.snapshot_dir,
                )))
            })
            .clone()
    }

    /// Bring the session to `Indexed`, building at most once.
    ///
    /// The build itself runs in a spawned task so that a caller abandoning
    /// its query future does not tear down a build other waiters share;
    /// losers of the race acquire the build lock after the winner and see
    /// the finished state.
    async fn ensure_indexed(
        &self,
        slot: &Arc<SessionSlot>,
        session_id: &str,
    ) -> Result<(), RagError> {
        if slot.state() == IndexState::Indexed {
            return Ok(());
        }

        let handle = tokio::spawn(build_session(
            slot.clone(),
            self.content.clone(),
            self.embedder.clone(),
            self.config.min_text_len,
            session_id.to_string(),
        ));
        handle.await.map_err(RagError::internal)?
    }

    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String, RagError> {
        let request = GenerationRequest::new(messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        self.generator.generate(request).await
    }
}

/// One guarded index build. Runs to completion once started, even if the
/// originating caller has disconnected.
async fn build_session(
    slot: Arc<SessionSlot>,
    content: Arc<dyn ContentSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    min_text_len: usize,
    session_id: String,
) -> Result<(), RagError> {
    let _guard = slot.build_lock.lock().await;
    if slot.state() == IndexState::Indexed {
        return Ok(());
    }

    slot.set_state(IndexState::Indexing);
    let mut store = slot.store.write().await;

    // A non-empty snapshot short-circuits the embedding pass entirely.
    let loaded = match store.load().await {
        Ok(loaded) => loaded,
        Err(e) => {
            slot.set_state(IndexState::Unindexed);
            return Err(e);
        }
    };
    if loaded > 0 {
        tracing::info!(%session_id, documents = loaded, "loaded knowledge snapshot");
        slot.set_state(IndexState::Indexed);
        return Ok(());
    }

    let items = match content.fetch(&session_id).await {
        Ok(items) => items,
        Err(e) => {
            slot.set_state(IndexState::Unindexed);
            return Err(e);
        }
    };

    let item_count = items.len();
    let indexer = Indexer::new(embedder, min_text_len);
    let outcome = match indexer.index(&mut store, items, false).await {
        Ok(outcome) => outcome,
        Err(e) => {
            slot.set_state(IndexState::Unindexed);
            return Err(e);
        }
    };

    if store.is_empty() {
        slot.set_state(IndexState::Unindexed);
        if outcome.failed > 0 {
            return Err(RagError::EmbeddingUnavailable(format!(
                "indexing failed for all {item_count} content items"
            )));
        }
        // Nothing usable to index; queries proceed without snippets.
        tracing::warn!(%session_id, "no indexable content for session");
        return Ok(());
    }

    slot.set_state(IndexState::Indexed);
    Ok(())
}

/// A session opened for repeated queries.
pub struct SessionHandle<'a> {
    engine: &'a RagEngine,
    session_id: String,
}

impl SessionHandle<'_> {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn query(
        &self,
        question: &str,
        options: QueryOptions,
    ) -> Result<QueryResponse, RagError> {
        self.engine.query(&self.session_id, question, options).await
    }

    pub async fn reindex(&self) -> Result<IndexOutcome, RagError> {
        self.engine.reindex(&self.session_id).await
    }

    pub async fn size(&self) -> usize {
        self.engine.session_size(&self.session_id).await
    }
}
