//! Row Scoring
//!
//! The per-row cosine routine every backend runs over its share of the matrix.

use std::ops::Range;

use super::matrix::EmbeddingMatrix;
use super::similarity::{bounded_cosine, dot_product};
use crate::error::BackendError;

/// Reject a query whose length differs from the matrix rows
pub fn check_shape(query: &[f32], matrix: &EmbeddingMatrix) -> Result<(), BackendError> {
    if query.len() != matrix.dimension() {
        return Err(BackendError::ShapeMismatch {
            query: query.len(),
            matrix: matrix.dimension(),
        });
    }
    Ok(())
}

/// Score a contiguous range of rows against a query with a known norm
#[inline]
pub fn score_range(
    query: &[f32],
    query_norm: f64,
    matrix: &EmbeddingMatrix,
    rows: Range<usize>,
) -> Vec<f32> {
    rows.map(|i| bounded_cosine(dot_product(query, matrix.row(i)), query_norm, matrix.norm(i)))
        .collect()
}
