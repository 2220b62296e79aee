use crate::storage::{BackendLocal, StorageManager};
use serde::{Deserialize, Serialize};

/// Threshold above which content counts as "the same version"
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.75;
/// Search results requested per query
const DEFAULT_MAX_SEARCH_RESULTS: usize = 5;
/// Timeout for outbound search requests in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
/// Retry attempts for a scheduled fetch cycle
const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
/// Base backoff between retries in seconds
const DEFAULT_FETCH_BACKOFF_SECS: u64 = 30;

/// Configuration for the semantic index mirror
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Default similarity threshold for search results [0.0, 1.0]
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model: crate::semantic::DEFAULT_MODEL.to_string(),
            search_threshold: crate::semantic::DEFAULT_SEARCH_THRESHOLD,
        }
    }
}

fn default_semantic_model() -> String {
    crate::semantic::DEFAULT_MODEL.to_string()
}

fn default_search_threshold() -> f32 {
    crate::semantic::DEFAULT_SEARCH_THRESHOLD
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Content/name similarity threshold for dedup decisions [0.0, 1.0]
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    #[serde(default = "default_fetch_backoff_secs")]
    pub fetch_backoff_secs: u64,

    /// Standard names a fetch cycle searches for
    #[serde(default = "default_tracked_standards")]
    pub tracked_standards: Vec<String>,

    /// Extra queries run on top of the per-standard ones
    #[serde(default = "default_general_queries")]
    pub general_queries: Vec<String>,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            fetch_backoff_secs: DEFAULT_FETCH_BACKOFF_SECS,
            tracked_standards: default_tracked_standards(),
            general_queries: default_general_queries(),
            semantic: SemanticConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_max_search_results() -> usize {
    DEFAULT_MAX_SEARCH_RESULTS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_fetch_attempts() -> u32 {
    DEFAULT_FETCH_ATTEMPTS
}

fn default_fetch_backoff_secs() -> u64 {
    DEFAULT_FETCH_BACKOFF_SECS
}

fn default_tracked_standards() -> Vec<String> {
    [
        "NIST Special Publications",
        "ISO 27001",
        "PCI DSS",
        "GDPR compliance",
        "SOC 2",
        "HIPAA",
        "CMMC cybersecurity",
        "CIS Controls",
        "OWASP Top 10",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_general_queries() -> Vec<String> {
    [
        "new cybersecurity standards updates",
        "recent changes security compliance requirements",
        "latest information security regulations updates",
        "cybersecurity framework updates recent",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    fn validate(&mut self) {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            panic!(
                "similarity_threshold must be between 0.0 and 1.0, got {}",
                self.similarity_threshold
            );
        }

        if !(0.0..=1.0).contains(&self.semantic.search_threshold) {
            panic!(
                "semantic.search_threshold must be between 0.0 and 1.0, got {}",
                self.semantic.search_threshold
            );
        }

        if self.max_search_results == 0 {
            self.max_search_results = 1;
        }

        if self.request_timeout_secs == 0 {
            panic!("request_timeout_secs must be greater than 0");
        }

        if self.fetch_attempts == 0 {
            self.fetch_attempts = 1;
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        let store = BackendLocal::new(base_path).expect("cannot create data directory");

        // create new if does not exist
        if !store.exists("config.yaml") {
            store
                .write(
                    "config.yaml",
                    serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
                )
                .expect("cannot write default config");
        }

        let config_str = String::from_utf8(store.read("config.yaml").expect("cannot read config"))
            .expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        config
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn versions_dir(&self) -> String {
        format!("{}/standards_versions", self.base_path)
    }

    pub fn changes_dir(&self) -> String {
        format!("{}/standards_changes", self.base_path)
    }

    pub fn semantic_dir(&self) -> String {
        format!("{}/semantic", self.base_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_creates_default_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();

        let config = Config::load_with(base);
        assert!(dir.path().join("config.yaml").exists());
        assert!((config.similarity_threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.max_search_results, 5);
        assert!(config
            .tracked_standards
            .iter()
            .any(|name| name == "PCI DSS"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "similarity_threshold: 0.6\n",
        )
        .unwrap();

        let config = Config::load_with(dir.path().to_str().unwrap());
        assert!((config.similarity_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.semantic.model, "all-MiniLM-L6-v2");
        assert_eq!(config.general_queries.len(), 4);
    }

    #[test]
    #[should_panic(expected = "similarity_threshold")]
    fn out_of_range_threshold_panics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "similarity_threshold: 1.5\n",
        )
        .unwrap();

        Config::load_with(dir.path().to_str().unwrap());
    }

    #[test]
    fn derived_paths_are_under_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let config = Config::load_with(base);

        assert_eq!(config.versions_dir(), format!("{base}/standards_versions"));
        assert_eq!(config.changes_dir(), format!("{base}/standards_changes"));
        assert_eq!(config.semantic_dir(), format!("{base}/semantic"));
    }
}
