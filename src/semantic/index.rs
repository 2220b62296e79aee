//! In-memory document index with cosine similarity search.

use serde::{Deserialize, Serialize};

/// Metadata attached to a mirrored version document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub standard_id: String,
    pub version_id: String,
    pub standard_name: String,
    pub version_date: String,
    pub source_url: Option<String>,
    /// True when this document mirrors a new version of an existing
    /// standard rather than a brand-new standard.
    #[serde(default)]
    pub is_update: bool,
}

/// One indexed document: metadata, a short content preview and the
/// embedding of the full content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub meta: DocumentMeta,
    pub preview: String,
    pub embedding: Vec<f32>,
}

/// Search result with its similarity score.
#[derive(Clone, Debug, Serialize)]
pub struct ScoredDocument {
    pub meta: DocumentMeta,
    pub preview: String,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,
}

/// Append-only document index.
///
/// Updates are appended as separate documents tagged `is_update`, the
/// store keeps full history and so does the mirror.
pub struct DocumentIndex {
    documents: Vec<IndexedDocument>,
    dimensions: usize,
}

impl DocumentIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            documents: Vec::new(),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[IndexedDocument] {
        &self.documents
    }

    pub fn insert(&mut self, document: IndexedDocument) -> Result<(), IndexError> {
        if document.embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: document.embedding.len(),
            });
        }
        if l2_norm(&document.embedding) < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        self.documents.push(document);
        Ok(())
    }

    /// Used when loading from storage.
    pub fn bulk_load(&mut self, documents: Vec<IndexedDocument>) -> Result<(), IndexError> {
        for document in documents {
            self.insert(document)?;
        }
        Ok(())
    }

    /// Cosine similarity search, highest score first.
    pub fn search(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut results: Vec<ScoredDocument> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let score = cosine(query, &doc.embedding, query_norm);
                if score >= threshold {
                    Some(ScoredDocument {
                        meta: doc.meta.clone(),
                        preview: doc.preview.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    dot / (query_norm * target_norm)
}
