//! Document Chunks
//!
//! Retrievable units of text with open metadata and an optional embedding.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar or text metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Integer(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Chunk metadata, keyed by caller-defined names
pub type Metadata = HashMap<String, MetadataValue>;

/// A unit of retrievable content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Text body
    pub content: String,
    /// Identifier of the originating document
    pub source: String,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Embedding vector, absent until computed
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl KnowledgeChunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Whether an embedding has been assigned
    pub fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }

    /// Embedding dimension, if embedded
    pub fn dim(&self) -> Option<usize> {
        self.embedding.as_ref().map(Vec::len)
    }
}
