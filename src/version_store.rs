//! Append-only version store for standards.
//!
//! Durable layout (one JSON document per addressable unit):
//! - `standards_versions/standards_index.json` - which versions belong to
//!   which standard and which one is latest (the only mutable record)
//! - `standards_versions/<version_id>.json` - immutable version snapshots
//! - `standards_changes/<change_id>.json` - immutable change records
//!
//! The index is flushed before `add_standard` returns. A crash after a
//! version file lands but before the index flush leaves an orphaned
//! version file; that needs a reconciliation pass, it is never silently
//! repaired here.

use chrono::{SecondsFormat, Utc};

use crate::diff::summarize_changes;
use crate::ids::{ChangeId, StandardId, VersionId};
use crate::models::{
    ChangeItem, StandardChange, StandardEntry, StandardSummary, StandardVersion, StandardsIndex,
};
use crate::similarity::SimilarityOracle;
use crate::storage::{BackendLocal, StorageManager};

/// Index file name inside the versions directory
const INDEX_FILE: &str = "standards_index.json";

/// Characters of content kept as the version summary
const SUMMARY_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record {name}: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of one `add_standard` call.
#[derive(Clone, Debug, serde::Serialize)]
pub struct AddOutcome {
    pub standard_id: StandardId,
    pub version_id: VersionId,
    pub is_new_standard: bool,
    /// False when the content was a near-duplicate of the current latest
    /// version and no new version was written.
    pub created_version: bool,
}

pub struct VersionStore {
    versions: BackendLocal,
    changes: BackendLocal,
    oracle: SimilarityOracle,
    similarity_threshold: f32,
    index: StandardsIndex,
}

impl VersionStore {
    /// Open (or initialize) a store over the two storage directories.
    ///
    /// An unreadable index is logged and treated as empty so a corrupt
    /// index file never takes the whole tracker down.
    pub fn open(
        versions_dir: &str,
        changes_dir: &str,
        oracle: SimilarityOracle,
        similarity_threshold: f32,
    ) -> Result<Self, StoreError> {
        let versions = BackendLocal::new(versions_dir)?;
        let changes = BackendLocal::new(changes_dir)?;

        let index = if versions.exists(INDEX_FILE) {
            let raw = versions.read(INDEX_FILE)?;
            match serde_json::from_slice(&raw) {
                Ok(index) => index,
                Err(e) => {
                    log::error!("standards index is unreadable, starting empty: {e}");
                    StandardsIndex::default()
                }
            }
        } else {
            StandardsIndex::default()
        };

        Ok(Self {
            versions,
            changes,
            oracle,
            similarity_threshold,
            index,
        })
    }

    /// Ingest content for a named standard.
    ///
    /// Resolution is first-match over the index (stable order): the first
    /// standard whose name similarity exceeds the threshold owns the
    /// content. Content similarity against that standard's latest version
    /// then decides between a silent duplicate (no write) and a new
    /// version with a change record.
    pub fn add_standard(
        &mut self,
        name: &str,
        content: &str,
        source_url: Option<&str>,
    ) -> Result<AddOutcome, StoreError> {
        if let Some(standard_id) = self.find_similar_standard(name) {
            let latest = self.get_latest_version(&standard_id)?;

            if let Some(latest) = &latest {
                let similarity = self.oracle.content_similarity(content, &latest.content);
                if similarity > self.similarity_threshold {
                    log::info!(
                        "content for '{name}' is near-identical to {} (similarity {similarity:.2}), keeping existing version",
                        latest.version_id
                    );
                    return Ok(AddOutcome {
                        standard_id,
                        version_id: latest.version_id.clone(),
                        is_new_standard: false,
                        created_version: false,
                    });
                }
            }

            let version_id = self.write_version(&standard_id, content, source_url)?;

            if let Some(latest) = latest {
                let items = summarize_changes(&latest.content, content);
                self.write_change(&standard_id, &latest.version_id, &version_id, items)?;
            }

            self.save_index()?;
            log::info!("added new version {version_id} for standard {standard_id}");

            Ok(AddOutcome {
                standard_id,
                version_id,
                is_new_standard: false,
                created_version: true,
            })
        } else {
            let standard_id = StandardId::generate();
            self.index.standards.insert(
                standard_id.clone(),
                StandardEntry {
                    name: name.to_string(),
                    created_date: now_iso(),
                    versions: Vec::new(),
                    latest_version: None,
                },
            );

            // No change record for a standard's first version.
            let version_id = self.write_version(&standard_id, content, source_url)?;

            self.save_index()?;
            log::info!("added new standard {standard_id} with initial version {version_id}");

            Ok(AddOutcome {
                standard_id,
                version_id,
                is_new_standard: true,
                created_version: true,
            })
        }
    }

    /// Basic info for every tracked standard.
    pub fn get_all_standards(&self) -> Result<Vec<StandardSummary>, StoreError> {
        let mut result = Vec::with_capacity(self.index.standards.len());

        for (id, entry) in &self.index.standards {
            let latest_version_date = match &entry.latest_version {
                Some(version_id) => self.get_version(version_id)?.map(|v| v.version_date),
                None => None,
            };

            result.push(StandardSummary {
                id: id.clone(),
                name: entry.name.clone(),
                created_date: entry.created_date.clone(),
                version_count: entry.versions.len(),
                latest_version_id: entry.latest_version.clone(),
                latest_version_date,
            });
        }

        Ok(result)
    }

    pub fn get_standard(&self, standard_id: &StandardId) -> Option<&StandardEntry> {
        self.index.standards.get(standard_id)
    }

    /// Case-insensitive exact name lookup.
    pub fn get_standard_by_name(&self, name: &str) -> Option<(StandardId, &StandardEntry)> {
        self.index
            .standards
            .iter()
            .find(|(_, entry)| entry.name.eq_ignore_ascii_case(name))
            .map(|(id, entry)| (id.clone(), entry))
    }

    /// All versions of a standard, newest first. Empty for unknown ids.
    pub fn get_standard_versions(
        &self,
        standard_id: &StandardId,
    ) -> Result<Vec<StandardVersion>, StoreError> {
        let Some(entry) = self.index.standards.get(standard_id) else {
            return Ok(Vec::new());
        };

        let mut versions = Vec::with_capacity(entry.versions.len());
        for (position, version_id) in entry.versions.iter().enumerate() {
            if let Some(version) = self.get_version(version_id)? {
                versions.push((position, version));
            }
        }

        // Newest first; creation order breaks timestamp ties.
        versions.sort_by(|(pos_a, a), (pos_b, b)| {
            b.version_date
                .cmp(&a.version_date)
                .then(pos_b.cmp(pos_a))
        });

        Ok(versions.into_iter().map(|(_, v)| v).collect())
    }

    /// Direct version lookup by id; `None` for unknown ids.
    pub fn get_version(&self, version_id: &VersionId) -> Result<Option<StandardVersion>, StoreError> {
        let file = version_file(version_id);
        if !self.versions.exists(&file) {
            return Ok(None);
        }

        let raw = self.versions.read(&file)?;
        let version = serde_json::from_slice(&raw)
            .map_err(|source| StoreError::Malformed { name: file, source })?;
        Ok(Some(version))
    }

    pub fn get_latest_version(
        &self,
        standard_id: &StandardId,
    ) -> Result<Option<StandardVersion>, StoreError> {
        let Some(entry) = self.index.standards.get(standard_id) else {
            return Ok(None);
        };
        let Some(version_id) = &entry.latest_version else {
            return Ok(None);
        };
        self.get_version(version_id)
    }

    /// Change record whose `new_version_id` matches, if any.
    ///
    /// Linear scan over the change files; change volume is small next to
    /// version content.
    pub fn get_version_changes(
        &self,
        version_id: &VersionId,
    ) -> Result<Option<StandardChange>, StoreError> {
        for name in self.changes.list() {
            if !name.ends_with(".json") {
                continue;
            }
            let raw = self.changes.read(&name)?;
            let change: StandardChange = serde_json::from_slice(&raw)
                .map_err(|source| StoreError::Malformed { name, source })?;
            if &change.new_version_id == version_id {
                return Ok(Some(change));
            }
        }
        Ok(None)
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// First standard whose name similarity exceeds the threshold.
    fn find_similar_standard(&self, name: &str) -> Option<StandardId> {
        self.index
            .standards
            .iter()
            .find(|(_, entry)| {
                self.oracle.name_similarity(name, &entry.name) > self.similarity_threshold
            })
            .map(|(id, _)| id.clone())
    }

    /// Write a version file and register it in the in-memory index.
    /// The caller is responsible for flushing the index afterwards.
    fn write_version(
        &mut self,
        standard_id: &StandardId,
        content: &str,
        source_url: Option<&str>,
    ) -> Result<VersionId, StoreError> {
        let entry = self
            .index
            .standards
            .get(standard_id)
            .expect("write_version called for a registered standard");

        let version_id = VersionId::generate();
        let version = StandardVersion {
            version_id: version_id.clone(),
            standard_id: standard_id.clone(),
            standard_name: entry.name.clone(),
            version_date: now_iso(),
            summary: summarize_content(content),
            content: content.to_string(),
            source_url: source_url.map(|s| s.to_string()),
        };

        let raw = serde_json::to_vec_pretty(&version)
            .map_err(|source| StoreError::Malformed { name: version_file(&version_id), source })?;
        self.versions.write(&version_file(&version_id), &raw)?;

        let entry = self
            .index
            .standards
            .get_mut(standard_id)
            .expect("write_version called for a registered standard");
        entry.versions.push(version_id.clone());
        entry.latest_version = Some(version_id.clone());

        Ok(version_id)
    }

    fn write_change(
        &self,
        standard_id: &StandardId,
        previous_version_id: &VersionId,
        new_version_id: &VersionId,
        items: Vec<ChangeItem>,
    ) -> Result<ChangeId, StoreError> {
        let change_id = ChangeId::generate();
        let change = StandardChange {
            change_id: change_id.clone(),
            standard_id: standard_id.clone(),
            previous_version_id: Some(previous_version_id.clone()),
            new_version_id: new_version_id.clone(),
            change_date: now_iso(),
            summary: format!(
                "Changes from version {previous_version_id} to {new_version_id}"
            ),
            changes: items,
        };

        let file = format!("{change_id}.json");
        let raw = serde_json::to_vec_pretty(&change)
            .map_err(|source| StoreError::Malformed { name: file.clone(), source })?;
        self.changes.write(&file, &raw)?;

        Ok(change_id)
    }

    fn save_index(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(&self.index)
            .map_err(|source| StoreError::Malformed { name: INDEX_FILE.into(), source })?;
        self.versions.write(INDEX_FILE, &raw)?;
        Ok(())
    }
}

fn version_file(version_id: &VersionId) -> String {
    format!("{version_id}.json")
}

fn summarize_content(content: &str) -> String {
    if content.chars().count() > SUMMARY_CHARS {
        let head: String = content.chars().take(SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
