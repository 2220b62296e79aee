//! High-level semantic index service.
//!
//! Mirrors accepted version-store writes as embedded documents and
//! serves search queries over them. The embedder is shared with the
//! version store's similarity oracle; the persisted index is loaded
//! lazily on first use.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::semantic::embeddings::EmbeddingError;
use crate::semantic::index::{
    DocumentIndex, DocumentMeta, IndexError, IndexedDocument, ScoredDocument,
};
use crate::semantic::storage::{IndexStorage, IndexStorageError};
use crate::similarity::TextEmbedder;

/// Index file name under the semantic base directory
const INDEX_FILE_NAME: &str = "index.json";

/// Characters of content kept as the stored preview
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] IndexStorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Vector-index collaborator interface consumed by the tracker.
pub trait VectorIndexSink: Send + Sync {
    fn add_document(&self, text: &str, meta: DocumentMeta) -> anyhow::Result<()>;
    fn persist(&self) -> anyhow::Result<()>;
}

struct IndexState {
    index: DocumentIndex,
    storage: IndexStorage,
}

/// Semantic index over the mirrored standards corpus.
///
/// Thread-safe through interior mutability.
pub struct SemanticIndexService {
    embedder: Arc<dyn TextEmbedder>,
    base_path: PathBuf,
    state: Mutex<Option<IndexState>>,
}

impl SemanticIndexService {
    /// Create a service rooted at `base_path` (`index.json` lives
    /// underneath it). The persisted index is not read until first use.
    pub fn new(embedder: Arc<dyn TextEmbedder>, base_path: PathBuf) -> Self {
        Self {
            embedder,
            base_path,
            state: Mutex::new(None),
        }
    }

    /// Embed `text` and append it to the index.
    pub fn add(&self, text: &str, meta: DocumentMeta) -> Result<(), SemanticError> {
        let embedding = self.embedder.embed(text)?;
        self.with_state(|state| {
            state.index.insert(IndexedDocument {
                meta,
                preview: preview_of(text),
                embedding,
            })?;
            Ok(())
        })
    }

    /// Flush the in-memory index to disk.
    pub fn save(&self) -> Result<(), SemanticError> {
        let model_id = self.embedder.model_id_hash();
        self.with_state(|state| {
            state.storage.save(&state.index, &model_id)?;
            Ok(())
        })
    }

    /// Search the mirrored corpus, highest similarity first.
    pub fn search(
        &self,
        query: &str,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, SemanticError> {
        let query_embedding = self.embedder.embed(query)?;
        self.with_state(|state| Ok(state.index.search(&query_embedding, threshold, limit)?))
    }

    /// Number of indexed documents, loading the index if needed.
    pub fn document_count(&self) -> Result<usize, SemanticError> {
        self.with_state(|state| Ok(state.index.len()))
    }

    fn with_state<F, R>(&self, f: F) -> Result<R, SemanticError>
    where
        F: FnOnce(&mut IndexState) -> Result<R, SemanticError>,
    {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| SemanticError::Internal(format!("Lock poisoned: {}", e)))?;

        if guard.is_none() {
            *guard = Some(self.load_index()?);
        }

        let state = guard.as_mut().expect("state initialized just above");
        f(state)
    }

    fn load_index(&self) -> Result<IndexState, SemanticError> {
        let model_id = self.embedder.model_id_hash();
        let dimensions = self.embedder.dimensions();

        std::fs::create_dir_all(&self.base_path)
            .map_err(|e| SemanticError::Internal(format!("cannot create {:?}: {e}", self.base_path)))?;
        let storage = IndexStorage::new(self.base_path.join(INDEX_FILE_NAME));

        let index = if storage.exists() {
            match storage.load(&model_id, dimensions) {
                Ok(index) => {
                    log::info!("loaded {} documents from semantic index", index.len());
                    index
                }
                Err(IndexStorageError::ModelMismatch) => {
                    log::warn!("embedding model changed, starting a fresh index");
                    DocumentIndex::new(dimensions)
                }
                Err(IndexStorageError::VersionMismatch(file_version, _)) => {
                    log::warn!(
                        "index format version {file_version} unsupported, starting a fresh index"
                    );
                    DocumentIndex::new(dimensions)
                }
                Err(e) => {
                    log::error!("failed to load semantic index: {e}");
                    return Err(e.into());
                }
            }
        } else {
            log::info!("no existing semantic index, starting fresh");
            DocumentIndex::new(dimensions)
        };

        Ok(IndexState { index, storage })
    }
}

impl VectorIndexSink for SemanticIndexService {
    fn add_document(&self, text: &str, meta: DocumentMeta) -> anyhow::Result<()> {
        Ok(self.add(text, meta)?)
    }

    fn persist(&self) -> anyhow::Result<()> {
        Ok(self.save()?)
    }
}

fn preview_of(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
