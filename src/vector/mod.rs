//! Vector Module
//!
//! Cosine primitives, the embedding matrix snapshot, and row scoring.

mod kernel;
mod matrix;
mod similarity;

pub use kernel::{check_shape, score_range};
pub use matrix::EmbeddingMatrix;
pub use similarity::{bounded_cosine, cosine_similarity, dot_product, magnitude, normalize_vector};
