//! Persistence for the semantic document index.
//!
//! The whole index is written as one JSON document with a versioned
//! envelope. The envelope records the format version, a SHA256 of the
//! model name and the embedding dimensions, so an index built by another
//! model or an older format is detected at load time instead of
//! producing nonsense scores.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::semantic::index::{DocumentIndex, IndexedDocument};

/// Current envelope format version
const FORMAT_VERSION: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid index file: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Format version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: index was built with a different model")]
    ModelMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u8,
    model_id: String,
    dimensions: usize,
    documents: Vec<IndexedDocument>,
}

/// Storage manager for the document index.
pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the index, validating model id and dimensions.
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<DocumentIndex, IndexStorageError> {
        let raw = std::fs::read(&self.path)?;
        let envelope: Envelope = serde_json::from_slice(&raw)?;

        if envelope.format_version > FORMAT_VERSION {
            return Err(IndexStorageError::VersionMismatch(
                envelope.format_version,
                FORMAT_VERSION,
            ));
        }
        if envelope.model_id != hex(expected_model_id) {
            return Err(IndexStorageError::ModelMismatch);
        }
        if envelope.dimensions != expected_dimensions {
            return Err(IndexStorageError::DimensionMismatch {
                expected: expected_dimensions,
                got: envelope.dimensions,
            });
        }

        let mut index = DocumentIndex::new(envelope.dimensions);
        // Zero-norm or mis-sized entries are dropped rather than failing
        // the whole load.
        for document in envelope.documents {
            if index.insert(document).is_err() {
                log::warn!("dropping invalid document while loading semantic index");
            }
        }

        Ok(index)
    }

    /// Save the index atomically: temp file, fsync, rename.
    pub fn save(
        &self,
        index: &DocumentIndex,
        model_id: &[u8; 32],
    ) -> Result<(), IndexStorageError> {
        let envelope = Envelope {
            format_version: FORMAT_VERSION,
            model_id: hex(model_id),
            dimensions: index.dimensions(),
            documents: index.documents().to_vec(),
        };

        let temp_path = self.path.with_extension("tmp");
        let result = (|| -> Result<(), IndexStorageError> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&serde_json::to_vec(&envelope)?)?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

fn hex(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::index::DocumentMeta;

    fn model_id() -> [u8; 32] {
        let mut id = [0u8; 32];
        id[0] = 0xAB;
        id[31] = 0xCD;
        id
    }

    fn doc(version_id: &str, embedding: Vec<f32>) -> IndexedDocument {
        IndexedDocument {
            meta: DocumentMeta {
                standard_id: "std_1".into(),
                version_id: version_id.into(),
                standard_name: "HIPAA".into(),
                version_date: "2026-02-01T00:00:00+00:00".into(),
                source_url: Some("https://example.com".into()),
                is_update: true,
            },
            preview: "p".into(),
            embedding,
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("index.json"));

        let mut index = DocumentIndex::new(3);
        index.insert(doc("v_1", vec![1.0, 0.0, 0.0])).unwrap();
        index.insert(doc("v_2", vec![0.0, 1.0, 0.0])).unwrap();

        storage.save(&index, &model_id()).unwrap();
        assert!(storage.exists());

        let loaded = storage.load(&model_id(), 3).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.documents()[0].meta.version_id, "v_1");
        assert!(loaded.documents()[1].meta.is_update);
    }

    #[test]
    fn model_mismatch_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("index.json"));

        let index = DocumentIndex::new(3);
        storage.save(&index, &model_id()).unwrap();

        let other = [0u8; 32];
        let result = storage.load(&other, 3);
        assert!(matches!(result, Err(IndexStorageError::ModelMismatch)));
    }

    #[test]
    fn dimension_mismatch_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("index.json"));

        let index = DocumentIndex::new(3);
        storage.save(&index, &model_id()).unwrap();

        let result = storage.load(&model_id(), 384);
        assert!(matches!(
            result,
            Err(IndexStorageError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn garbage_file_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let storage = IndexStorage::new(path);
        let result = storage.load(&model_id(), 3);
        assert!(matches!(result, Err(IndexStorageError::InvalidFormat(_))));
    }

    #[test]
    fn failed_save_cleans_up_temp_file() {
        let path = PathBuf::from("/nonexistent/dir/index.json");
        let storage = IndexStorage::new(path.clone());

        let index = DocumentIndex::new(3);
        assert!(storage.save(&index, &model_id()).is_err());
        assert!(!path.with_extension("tmp").exists());
    }
}
