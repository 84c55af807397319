//! Embedding Matrix
//!
//! Dense row-major snapshot of every embedded chunk in a knowledge base.

use std::ops::Range;
use tracing::warn;

use super::similarity::magnitude;
use crate::corpus::KnowledgeBase;

/// Row-major embedding matrix with per-row norms
///
/// Row `i` holds the embedding of corpus chunk `chunk_indices[i]`; rows keep
/// corpus insertion order. Chunks without an embedding have no row.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    data: Vec<f32>,
    norms: Vec<f64>,
    chunk_indices: Vec<usize>,
    dimension: usize,
}

impl EmbeddingMatrix {
    /// Snapshot the embedded chunks of a knowledge base.
    ///
    /// Returns `None` when no chunk carries an embedding.
    pub fn from_knowledge_base(kb: &KnowledgeBase) -> Option<Self> {
        let dimension = kb.iter().find_map(|c| c.dim())?;
        let rows = kb.embedded_count();

        let mut data = Vec::with_capacity(rows * dimension);
        let mut norms = Vec::with_capacity(rows);
        let mut chunk_indices = Vec::with_capacity(rows);

        for (index, chunk) in kb.iter().enumerate() {
            let Some(embedding) = &chunk.embedding else {
                continue;
            };
            if embedding.len() != dimension {
                warn!(
                    index,
                    expected = dimension,
                    actual = embedding.len(),
                    "Skipping chunk with mismatched embedding dimension"
                );
                continue;
            }
            data.extend_from_slice(embedding);
            norms.push(magnitude(embedding));
            chunk_indices.push(index);
        }

        Some(Self {
            data,
            norms,
            chunk_indices,
            dimension,
        })
    }

    /// Build directly from rows; row `i` maps to chunk index `i`
    pub fn from_rows(rows: &[Vec<f32>]) -> Option<Self> {
        let dimension = rows.first()?.len();
        if dimension == 0 || rows.iter().any(|r| r.len() != dimension) {
            return None;
        }
        Some(Self {
            data: rows.concat(),
            norms: rows.iter().map(|r| magnitude(r)).collect(),
            chunk_indices: (0..rows.len()).collect(),
            dimension,
        })
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.norms.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    /// Embedding of row `i`
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Precomputed norm of row `i`
    #[inline]
    pub fn norm(&self, i: usize) -> f64 {
        self.norms[i]
    }

    /// Corpus position of the chunk behind row `i`
    #[inline]
    pub fn chunk_index(&self, i: usize) -> usize {
        self.chunk_indices[i]
    }

    /// Split `0..rows` into at most `parts` contiguous, non-empty ranges
    pub fn partition(&self, parts: usize) -> Vec<Range<usize>> {
        let rows = self.rows();
        let parts = parts.clamp(1, rows.max(1));
        let base = rows / parts;
        let extra = rows % parts;

        let mut ranges = Vec::with_capacity(parts);
        let mut start = 0;
        for p in 0..parts {
            let len = base + usize::from(p < extra);
            if len == 0 {
                break;
            }
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }

    /// Approximate heap footprint in bytes
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
            + self.norms.len() * std::mem::size_of::<f64>()
            + self.chunk_indices.len() * std::mem::size_of::<usize>()
    }
}
