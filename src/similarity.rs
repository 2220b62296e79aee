//! Text similarity scoring for dedup decisions.
//!
//! Content similarity uses embeddings (cosine) when an embedder is
//! available and degrades to lexical Jaccard similarity on any embedding
//! failure. Name similarity is always lexical. Scores are in [0, 1].

use std::collections::HashSet;
use std::sync::Arc;

use crate::semantic::EmbeddingError;

/// Anything that can turn text into an embedding vector.
///
/// Implemented by the fastembed wrapper in production; tests substitute
/// fixed-vector fakes to force similarity outcomes. A single instance is
/// shared between the similarity oracle and the semantic index so the
/// model is only loaded once.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimensions(&self) -> usize;

    /// Stable identifier for the model, persisted next to its vectors.
    fn model_id_hash(&self) -> [u8; 32];
}

impl TextEmbedder for crate::semantic::EmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        crate::semantic::EmbeddingModel::embed(self, text)
    }

    fn dimensions(&self) -> usize {
        crate::semantic::EmbeddingModel::dimensions(self)
    }

    fn model_id_hash(&self) -> [u8; 32] {
        crate::semantic::EmbeddingModel::model_id_hash(self)
    }
}

/// Similarity oracle used by the version store.
#[derive(Clone, Default)]
pub struct SimilarityOracle {
    embedder: Option<Arc<dyn TextEmbedder>>,
}

impl SimilarityOracle {
    /// Lexical-only oracle (no embedding model).
    pub fn lexical() -> Self {
        Self { embedder: None }
    }

    pub fn with_embedder(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder: Some(embedder),
        }
    }

    /// Similarity between two content blobs in [0, 1].
    ///
    /// Never fails: embedding errors fall back to lexical similarity,
    /// which returns 0.0 only when either token set is empty.
    pub fn content_similarity(&self, a: &str, b: &str) -> f32 {
        if let Some(embedder) = &self.embedder {
            match (embedder.embed(a), embedder.embed(b)) {
                (Ok(va), Ok(vb)) => return cosine_similarity(&va, &vb).clamp(0.0, 1.0),
                (Err(e), _) | (_, Err(e)) => {
                    log::warn!("embedding failed, falling back to lexical similarity: {e}");
                }
            }
        }
        lexical_similarity(a, b)
    }

    /// Similarity between two standard names in [0, 1] (always lexical).
    pub fn name_similarity(&self, a: &str, b: &str) -> f32 {
        lexical_similarity(a, b)
    }
}

/// Jaccard similarity over normalized word sets.
pub fn lexical_similarity(a: &str, b: &str) -> f32 {
    let words_a = normalized_words(a);
    let words_b = normalized_words(b);

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    intersection as f32 / union as f32
}

/// Lowercase, strip punctuation, split on whitespace.
fn normalized_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(|w| w.to_string())
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}
