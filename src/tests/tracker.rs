use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fetcher::{NewsFetcher, SearchHit, SearchProvider};
use crate::semantic::{DocumentMeta, VectorIndexSink};
use crate::similarity::SimilarityOracle;
use crate::tests::open_store_in;
use crate::tracker::{run_with_retries, StandardsTracker};

const LONG_CONTENT_A: &str = "Requirement 1: install and maintain network security controls.\n\
    Requirement 2: apply secure configurations to all system components.";

const LONG_CONTENT_B: &str = "Chapter 3: protect stored account data with strong cryptography.\n\
    Chapter 4: encrypt transmission over open public networks.";

/// Provider that hands back a fixed batch of hits for every query.
struct FixedProvider {
    hits: Mutex<Vec<SearchHit>>,
}

impl FixedProvider {
    fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits: Mutex::new(hits),
        }
    }
}

impl SearchProvider for FixedProvider {
    fn search(&self, _query: &str, _max_results: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(self.hits.lock().unwrap().clone())
    }
}

/// Sink that records mirrored documents instead of embedding them.
#[derive(Default)]
struct RecordingSink {
    docs: Mutex<Vec<DocumentMeta>>,
    persists: AtomicUsize,
}

impl VectorIndexSink for Arc<RecordingSink> {
    fn add_document(&self, _text: &str, meta: DocumentMeta) -> anyhow::Result<()> {
        self.docs.lock().unwrap().push(meta);
        Ok(())
    }

    fn persist(&self) -> anyhow::Result<()> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn pci_hit(content: &str) -> SearchHit {
    SearchHit {
        title: "PCI DSS requirement updates".into(),
        content: content.into(),
        url: "https://example.com/pci".into(),
    }
}

fn tracker_with(
    tmp: &tempfile::TempDir,
    hits: Vec<SearchHit>,
) -> (StandardsTracker, Arc<RecordingSink>) {
    let fetcher = NewsFetcher::new(
        Box::new(FixedProvider::new(hits)),
        vec!["PCI DSS".into()],
        vec![],
        5,
    );
    let store = open_store_in(tmp.path(), SimilarityOracle::lexical());
    let sink = Arc::new(RecordingSink::default());
    let tracker = StandardsTracker::new(fetcher, store, Some(Box::new(sink.clone())));
    (tracker, sink)
}

#[test]
fn cycle_adds_once_and_dedups_repeats() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut tracker, sink) = tracker_with(
        &tmp,
        vec![pci_hit(LONG_CONTENT_A), pci_hit(LONG_CONTENT_A)],
    );

    let report = tracker.run_fetch_cycle().unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.added, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);

    // Only the accepted write reaches the mirror.
    let docs = sink.docs.lock().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].standard_name, "PCI DSS");
    assert!(!docs[0].is_update);
    assert_eq!(sink.persists.load(Ordering::SeqCst), 1);
}

#[test]
fn short_content_is_skipped_before_the_store() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut tracker, sink) = tracker_with(&tmp, vec![pci_hit("too short to version")]);

    let report = tracker.run_fetch_cycle().unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.added, 0);
    assert!(tracker.store().get_all_standards().unwrap().is_empty());

    // Nothing accepted, nothing mirrored, nothing persisted.
    assert!(sink.docs.lock().unwrap().is_empty());
    assert_eq!(sink.persists.load(Ordering::SeqCst), 0);
}

#[test]
fn changed_content_counts_as_update() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut tracker, sink) = tracker_with(&tmp, vec![pci_hit(LONG_CONTENT_A)]);

    let first = tracker.run_fetch_cycle().unwrap();
    assert_eq!(first.added, 1);

    let second = tracker.process_candidates(vec![pci_hit(LONG_CONTENT_B)]);
    assert_eq!(second.added, 0);
    assert_eq!(second.updated, 1);

    let docs = sink.docs.lock().unwrap();
    assert_eq!(docs.len(), 2);
    assert!(!docs[0].is_update);
    assert!(docs[1].is_update);
    assert_eq!(docs[0].standard_id, docs[1].standard_id);
    assert_ne!(docs[0].version_id, docs[1].version_id);
}

#[test]
fn duplicate_cycle_does_not_touch_the_mirror() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut tracker, sink) = tracker_with(&tmp, vec![pci_hit(LONG_CONTENT_A)]);

    tracker.run_fetch_cycle().unwrap();
    let second = tracker.run_fetch_cycle().unwrap();

    assert_eq!(second.duplicates, 1);
    assert_eq!(second.added + second.updated, 0);

    // No accepted write in the second cycle: no mirror doc, no re-persist.
    assert_eq!(sink.docs.lock().unwrap().len(), 1);
    assert_eq!(sink.persists.load(Ordering::SeqCst), 1);
}

#[test]
fn tracker_without_sink_still_versions() {
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = NewsFetcher::new(
        Box::new(FixedProvider::new(vec![pci_hit(LONG_CONTENT_A)])),
        vec!["PCI DSS".into()],
        vec![],
        5,
    );
    let store = open_store_in(tmp.path(), SimilarityOracle::lexical());
    let mut tracker = StandardsTracker::new(fetcher, store, None);

    let report = tracker.run_fetch_cycle().unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(tracker.store().get_all_standards().unwrap().len(), 1);
}

#[test]
fn retries_return_the_first_successful_report() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut tracker, _sink) = tracker_with(&tmp, vec![pci_hit(LONG_CONTENT_A)]);

    let report = run_with_retries(&mut tracker, 3, Duration::from_millis(0)).unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.added, 1);
}
