//! Search Results

use serde::Serialize;

use crate::backend::Backend;
use crate::corpus::{KnowledgeChunk, Metadata};

/// A chunk matched by a search, with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub content: String,
    pub source: String,
    pub metadata: Metadata,
    /// Cosine similarity in [-1.0, 1.0]
    pub score: f32,
}

impl ScoredChunk {
    pub(crate) fn from_chunk(chunk: &KnowledgeChunk, score: f32) -> Self {
        Self {
            content: chunk.content.clone(),
            source: chunk.source.clone(),
            metadata: chunk.metadata.clone(),
            score,
        }
    }
}

/// Ranked results plus the backend that scored them and the time it took
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<ScoredChunk>,
    pub backend: Backend,
    pub elapsed_ms: f64,
}

impl SearchOutcome {
    /// Split into `(results, backend_used, elapsed_ms)`
    pub fn into_parts(self) -> (Vec<ScoredChunk>, Backend, f64) {
        (self.results, self.backend, self.elapsed_ms)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Highest-scoring result
    pub fn best(&self) -> Option<&ScoredChunk> {
        self.results.first()
    }
}
