//! SEMSEARCH - Multi-Backend Semantic Retrieval Engine
//!
//! Cosine-similarity search over an embedded knowledge base, scored on the
//! fastest available backend (resident worker pool, rayon, or plain CPU)
//! with automatic fallback.

pub mod backend;
pub mod bench;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod retriever;
pub mod vector;

pub use backend::{Backend, BackendSelector, BackendStatus};
pub use corpus::{KnowledgeBase, KnowledgeChunk, Metadata, MetadataValue, SharedKnowledgeBase};
pub use error::{BackendError, Error, Result};
pub use metrics::SearchMetrics;
pub use retriever::{RetrieverConfig, ScoredChunk, SearchOutcome, SemanticRetriever};
pub use vector::{cosine_similarity, EmbeddingMatrix};
