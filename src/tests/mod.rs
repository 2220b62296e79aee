mod tracker;

use crate::similarity::SimilarityOracle;
use crate::version_store::VersionStore;

/// Creates an isolated VersionStore using a unique temp directory.
/// Each test gets its own directory so parallel tests never collide,
/// and no real data is touched.
pub fn create_store(oracle: SimilarityOracle) -> (VersionStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let store = open_store_in(tmp.path(), oracle);
    (store, tmp)
}

/// Opens a store over an existing directory, for reopen tests.
pub fn open_store_in(base: &std::path::Path, oracle: SimilarityOracle) -> VersionStore {
    VersionStore::open(
        base.join("standards_versions").to_str().unwrap(),
        base.join("standards_changes").to_str().unwrap(),
        oracle,
        0.75,
    )
    .expect("failed to open version store")
}
