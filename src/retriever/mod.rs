//! Semantic Retriever
//!
//! Ranks knowledge base chunks against a query embedding using whichever
//! scoring backend the selector picks, and caches the corpus embedding
//! matrix between searches.
//!
//! The cached matrix is only valid while the corpus is unchanged. Code that
//! adds chunks or assigns embeddings must call [`SemanticRetriever::clear_cache`]
//! afterwards, or mutate through [`SemanticRetriever::update_corpus`], which
//! does both under the corpus write lock.

mod config;
mod results;

pub use config::RetrieverConfig;
pub use results::{ScoredChunk, SearchOutcome};

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendSelector};
use crate::corpus::{KnowledgeBase, SharedKnowledgeBase};
use crate::error::{Error, Result};
use crate::metrics::SearchMetrics;
use crate::vector::EmbeddingMatrix;

/// Semantic search over a shared knowledge base
pub struct SemanticRetriever {
    kb: SharedKnowledgeBase,
    config: RetrieverConfig,
    selector: BackendSelector,
    /// Embedding matrix of `kb`, built on first search
    cache: RwLock<Option<Arc<EmbeddingMatrix>>>,
    metrics: Arc<SearchMetrics>,
}

impl SemanticRetriever {
    /// Create a retriever with default configuration
    pub fn new(kb: SharedKnowledgeBase) -> Self {
        Self::with_config(kb, RetrieverConfig::default())
    }

    /// Create a retriever, starting the backends `config` enables
    pub fn with_config(kb: SharedKnowledgeBase, config: RetrieverConfig) -> Self {
        let selector = BackendSelector::new(&config);
        Self::with_selector(kb, config, selector)
    }

    /// Create a retriever around an existing selector
    pub fn with_selector(
        kb: SharedKnowledgeBase,
        config: RetrieverConfig,
        selector: BackendSelector,
    ) -> Self {
        Self {
            kb,
            config,
            selector,
            cache: RwLock::new(None),
            metrics: Arc::new(SearchMetrics::new()),
        }
    }

    /// Search with the configured default `top_k` and threshold
    pub fn search(&self, query_embedding: &[f32]) -> Result<SearchOutcome> {
        self.semantic_search(
            query_embedding,
            self.config.default_top_k,
            self.config.default_score_threshold,
            None,
        )
    }

    /// Rank embedded chunks by cosine similarity to `query_embedding`.
    ///
    /// Returns at most `top_k` chunks scoring at least `score_threshold`,
    /// best first; equal scores keep corpus order. `backend_preference` names
    /// a backend (`"cpu"`, `"numpy"`, `"rayon"`, `"pool"`) or `"auto"`.
    ///
    /// An empty corpus, or one with no embedded chunk, yields an empty
    /// outcome reported on [`Backend::Cpu`] without running a kernel.
    pub fn semantic_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        score_threshold: f32,
        backend_preference: Option<&str>,
    ) -> Result<SearchOutcome> {
        if query_embedding.is_empty() {
            return Err(Error::EmptyQuery);
        }
        if top_k == 0 {
            return Err(Error::InvalidTopK);
        }
        if !(-1.0..=1.0).contains(&score_threshold) {
            return Err(Error::InvalidThreshold(score_threshold));
        }

        let kb = self.kb.read();
        // Lock wait is excluded from the reported latency.
        let start = Instant::now();

        let Some(matrix) = self.embedding_matrix(&kb) else {
            let elapsed = start.elapsed();
            self.metrics.record_empty_search(elapsed);
            debug!(chunks = kb.len(), "No embedded chunks to search");
            return Ok(SearchOutcome {
                results: Vec::new(),
                backend: Backend::Cpu,
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            });
        };

        if query_embedding.len() != matrix.dimension() {
            return Err(Error::DimensionMismatch {
                expected: matrix.dimension(),
                actual: query_embedding.len(),
            });
        }

        let backend = self.selector.select(query_embedding, backend_preference);
        let scored = self.selector.score(backend, query_embedding, &matrix);
        self.metrics.record_fallbacks(scored.fallbacks);

        let mut ranked: Vec<(usize, f32)> = scored
            .scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score >= score_threshold)
            .collect();
        // Stable sort: ties keep corpus order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(top_k);

        let results: Vec<ScoredChunk> = ranked
            .into_iter()
            .filter_map(|(row, score)| {
                let index = matrix.chunk_index(row);
                let chunk = kb.get(index);
                if chunk.is_none() {
                    warn!(index, "Cached matrix refers to a missing chunk");
                }
                chunk.map(|c| ScoredChunk::from_chunk(c, score))
            })
            .collect();

        let elapsed = start.elapsed();
        self.metrics.record_search(scored.backend, elapsed);
        debug!(
            backend = %scored.backend,
            candidates = matrix.rows(),
            results = results.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "Semantic search complete"
        );

        Ok(SearchOutcome {
            results,
            backend: scored.backend,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        })
    }

    /// Cached matrix, rebuilt from `kb` after invalidation
    fn embedding_matrix(&self, kb: &KnowledgeBase) -> Option<Arc<EmbeddingMatrix>> {
        if let Some(matrix) = self.cache.read().as_ref() {
            return Some(matrix.clone());
        }

        let mut cache = self.cache.write();
        if let Some(matrix) = cache.as_ref() {
            return Some(matrix.clone());
        }

        let matrix = Arc::new(EmbeddingMatrix::from_knowledge_base(kb)?);
        info!(
            rows = matrix.rows(),
            dimension = matrix.dimension(),
            bytes = matrix.memory_bytes(),
            "Built embedding matrix for {}",
            kb.name
        );
        self.metrics.record_cache_rebuild();
        *cache = Some(matrix.clone());
        Some(matrix)
    }

    /// Drop the cached embedding matrix; the next search rebuilds it
    pub fn clear_cache(&self) {
        if self.cache.write().take().is_some() {
            debug!("Embedding matrix cache cleared");
        }
    }

    /// Whether an embedding matrix is cached
    pub fn is_cached(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Mutate the knowledge base and invalidate the cache in one step
    pub fn update_corpus<R>(&self, f: impl FnOnce(&mut KnowledgeBase) -> R) -> R {
        let mut kb = self.kb.write();
        let result = f(&mut kb);
        self.clear_cache();
        result
    }

    /// Shared handle to the knowledge base
    pub fn knowledge_base(&self) -> &SharedKnowledgeBase {
        &self.kb
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    pub fn metrics(&self) -> &Arc<SearchMetrics> {
        &self.metrics
    }
}
