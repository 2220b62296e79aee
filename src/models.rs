//! Persisted record types for standards, versions and change records.
//!
//! Every record is a plain serde struct written as one JSON document per
//! file, so malformed state fails at decode time instead of surfacing as
//! missing-field surprises deep in the versioning logic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{ChangeId, StandardId, VersionId};

/// Index entry for one tracked standard lineage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardEntry {
    pub name: String,
    pub created_date: String,
    /// Version ids in creation order (oldest first)
    pub versions: Vec<VersionId>,
    pub latest_version: Option<VersionId>,
}

/// The standards index: single source of truth for which versions belong
/// to which standard and which one is latest.
///
/// BTreeMap keeps iteration order stable across runs; similarity matching
/// scans this map, so an unordered map would make match results depend on
/// hash seeds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StandardsIndex {
    pub standards: BTreeMap<StandardId, StandardEntry>,
}

/// One immutable snapshot of a standard's content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardVersion {
    pub version_id: VersionId,
    pub standard_id: StandardId,
    pub standard_name: String,
    pub version_date: String,
    /// Leading slice of the content, for listings
    pub summary: String,
    pub content: String,
    pub source_url: Option<String>,
}

/// Kind of a single change between two versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Addition,
    Removal,
    Modification,
}

/// One item in a change record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeItem {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub description: String,
    pub content: String,
}

/// Recorded delta between two consecutive versions of a standard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardChange {
    pub change_id: ChangeId,
    pub standard_id: StandardId,
    pub previous_version_id: Option<VersionId>,
    pub new_version_id: VersionId,
    pub change_date: String,
    pub summary: String,
    pub changes: Vec<ChangeItem>,
}

/// Listing row returned by `VersionStore::get_all_standards`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StandardSummary {
    pub id: StandardId,
    pub name: String,
    pub created_date: String,
    pub version_count: usize,
    pub latest_version_id: Option<VersionId>,
    pub latest_version_date: Option<String>,
}
