//! Knowledge Base
//!
//! Ordered chunk collection that keeps embedding dimensions consistent.

use parking_lot::RwLock;
use std::sync::Arc;

use super::chunk::KnowledgeChunk;
use crate::error::{Error, Result};

/// Knowledge base shared between the loading path and the retriever
pub type SharedKnowledgeBase = Arc<RwLock<KnowledgeBase>>;

/// Ordered collection of document chunks
///
/// Insertion order is preserved and used to break score ties during search.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub name: String,
    pub description: String,
    chunks: Vec<KnowledgeChunk>,
    /// Dimension shared by every embedded chunk (None until the first one)
    dimension: Option<usize>,
}

impl KnowledgeBase {
    /// Create a new empty knowledge base
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Wrap into a handle the retriever can share
    pub fn into_shared(self) -> SharedKnowledgeBase {
        Arc::new(RwLock::new(self))
    }

    /// Append a chunk, rejecting embeddings of the wrong dimension
    pub fn add_chunk(&mut self, chunk: KnowledgeChunk) -> Result<()> {
        if let Some(embedding) = &chunk.embedding {
            self.check_dimension(self.chunks.len(), embedding)?;
            if self.dimension.is_none() {
                self.dimension = Some(embedding.len());
            }
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Append several chunks; stops at the first rejected chunk
    pub fn add_chunks(
        &mut self,
        chunks: impl IntoIterator<Item = KnowledgeChunk>,
    ) -> Result<usize> {
        let mut added = 0;
        for chunk in chunks {
            self.add_chunk(chunk)?;
            added += 1;
        }
        Ok(added)
    }

    /// Assign or replace the embedding of an existing chunk
    pub fn set_embedding(&mut self, index: usize, embedding: Vec<f32>) -> Result<()> {
        let len = self.chunks.len();
        if index >= len {
            return Err(Error::ChunkOutOfRange { index, len });
        }
        // A lone embedded chunk may be re-embedded at a new dimension.
        let others_embedded = self
            .chunks
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && c.is_embedded());
        if others_embedded {
            self.check_dimension(index, &embedding)?;
        } else if embedding.is_empty() {
            return Err(Error::EmptyEmbedding(index));
        }
        self.dimension = Some(embedding.len());
        self.chunks[index].embedding = Some(embedding);
        Ok(())
    }

    fn check_dimension(&self, index: usize, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Err(Error::EmptyEmbedding(index));
        }
        match self.dimension {
            Some(expected) if expected != embedding.len() => Err(Error::DimensionMismatch {
                expected,
                actual: embedding.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Get a chunk by position
    pub fn get(&self, index: usize) -> Option<&KnowledgeChunk> {
        self.chunks.get(index)
    }

    /// Iterate chunks in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, KnowledgeChunk> {
        self.chunks.iter()
    }

    /// All chunks in insertion order
    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    /// Number of chunks (embedded or not)
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of chunks carrying an embedding
    pub fn embedded_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_embedded()).count()
    }

    /// Embedding dimension of the corpus, if any chunk is embedded
    pub fn dimension(&self) -> Option<usize> {
        if self.chunks.iter().any(KnowledgeChunk::is_embedded) {
            self.dimension
        } else {
            None
        }
    }

    /// Indices of chunks still waiting for an embedding
    pub fn pending_embedding(&self) -> Vec<usize> {
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_embedded())
            .map(|(i, _)| i)
            .collect()
    }
}

impl<'a> IntoIterator for &'a KnowledgeBase {
    type Item = &'a KnowledgeChunk;
    type IntoIter = std::slice::Iter<'a, KnowledgeChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}
