//! Semantic index over accepted standard versions.
//!
//! Accepted version-store writes are mirrored here as documents with
//! embeddings, supporting keyword/semantic search over the corpus.
//!
//! - `embeddings`: fastembed wrapper for local embedding generation
//! - `index`: in-memory document index with cosine similarity search
//! - `storage`: atomic JSON persistence for the index
//! - `service`: high-level service tying the three together

pub mod embeddings;
mod index;
mod service;
mod storage;

pub use embeddings::{EmbeddingError, EmbeddingModel};
pub use index::{DocumentIndex, DocumentMeta, IndexError, IndexedDocument, ScoredDocument};
pub use service::{SemanticError, SemanticIndexService, VectorIndexSink};
pub use storage::{IndexStorage, IndexStorageError};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Default similarity threshold for semantic search results
pub const DEFAULT_SEARCH_THRESHOLD: f32 = 0.35;
