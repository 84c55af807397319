//! Error Types
//!
//! Caller-facing errors and backend failures that are absorbed by fallback.

use thiserror::Error;

use crate::backend::Backend;

/// Errors surfaced to callers of the retriever and the knowledge base
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Query embedding has no components
    #[error("query embedding is empty")]
    EmptyQuery,

    /// Vector length differs from the corpus embedding dimension
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `top_k` must be at least 1
    #[error("top_k must be a positive integer")]
    InvalidTopK,

    /// Threshold outside the cosine range or not a number
    #[error("score threshold {0} is outside [-1.0, 1.0]")]
    InvalidThreshold(f32),

    /// Embedding assigned to a chunk has no components
    #[error("embedding for chunk {0} is empty")]
    EmptyEmbedding(usize),

    /// Chunk index past the end of the knowledge base
    #[error("chunk index {index} out of range (len {len})")]
    ChunkOutOfRange { index: usize, len: usize },
}

/// Failure inside a specific scoring backend.
///
/// Never returned from a search; the selector logs it and falls back to the
/// next backend in priority order.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend {0} is not available")]
    Unavailable(Backend),

    #[error("worker pool is shut down")]
    Disconnected,

    #[error("worker {0} panicked while scoring")]
    WorkerPanicked(usize),

    #[error("query has {query} components but matrix rows have {matrix}")]
    ShapeMismatch { query: usize, matrix: usize },

    #[error("backend returned {actual} scores for {expected} rows")]
    IncompleteScores { expected: usize, actual: usize },
}

/// Result type for retrieval operations
pub type Result<T> = std::result::Result<T, Error>;
