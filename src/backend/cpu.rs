//! CPU Backend
//!
//! Scores every row on the calling thread.

use crate::vector::{magnitude, score_range, EmbeddingMatrix};

/// Single-threaded scoring backend
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    /// Score all rows. Cannot fail; callers check the query shape first.
    pub fn cosine_scores(&self, query: &[f32], matrix: &EmbeddingMatrix) -> Vec<f32> {
        score_range(query, magnitude(query), matrix, 0..matrix.rows())
    }
}
