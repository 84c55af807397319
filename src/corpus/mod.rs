//! Corpus Module
//!
//! Document chunks and the knowledge base they live in.

mod chunk;
mod knowledge_base;

pub use chunk::{KnowledgeChunk, Metadata, MetadataValue};
pub use knowledge_base::{KnowledgeBase, SharedKnowledgeBase};
