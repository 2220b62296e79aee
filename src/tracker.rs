//! Fetch-and-update cycle orchestration.
//!
//! Composes the web fetcher, the version store and the semantic index
//! mirror: fetch candidates, version the ones that survive extraction and
//! length checks, mirror accepted writes into the index. One bad
//! candidate is logged and counted, it never kills the cycle.

use std::time::Duration;

use crate::fetcher::{NewsFetcher, SearchHit};
use crate::semantic::{DocumentMeta, VectorIndexSink};
use crate::version_store::VersionStore;

/// Candidates with less content than this are discarded (too short to be
/// a meaningful standard excerpt).
const MIN_CONTENT_CHARS: usize = 100;

/// Aggregate outcome of one fetch cycle.
#[derive(Clone, Copy, Debug, Default, serde::Serialize)]
pub struct CycleReport {
    /// Candidates seen
    pub processed: usize,
    /// New standards created
    pub added: usize,
    /// New versions of existing standards
    pub updated: usize,
    /// Near-identical content, no version written
    pub duplicates: usize,
    /// Discarded before reaching the store (short content)
    pub skipped: usize,
    /// Candidates that errored
    pub failed: usize,
}

pub struct StandardsTracker {
    fetcher: NewsFetcher,
    store: VersionStore,
    /// None when the embedding model is unavailable; the corpus still
    /// versions, only the search mirror goes stale.
    sink: Option<Box<dyn VectorIndexSink>>,
}

impl StandardsTracker {
    pub fn new(
        fetcher: NewsFetcher,
        store: VersionStore,
        sink: Option<Box<dyn VectorIndexSink>>,
    ) -> Self {
        Self {
            fetcher,
            store,
            sink,
        }
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// One complete fetch cycle: search, version, mirror.
    pub fn run_fetch_cycle(&mut self) -> anyhow::Result<CycleReport> {
        log::info!("starting standards update fetch cycle");

        let hits = self.fetcher.fetch_candidate_updates();
        let report = self.process_candidates(hits);

        log::info!(
            "fetch cycle completed: {} processed, {} added, {} updated, {} duplicates, {} skipped, {} failed",
            report.processed, report.added, report.updated, report.duplicates, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Version each candidate and mirror accepted writes.
    pub fn process_candidates(&mut self, hits: Vec<SearchHit>) -> CycleReport {
        let mut report = CycleReport::default();

        for hit in hits {
            report.processed += 1;

            let candidate = self.fetcher.extract_standard_info(&hit);

            if candidate.content.chars().count() < MIN_CONTENT_CHARS {
                report.skipped += 1;
                continue;
            }

            let outcome = match self.store.add_standard(
                &candidate.name,
                &candidate.content,
                candidate.source_url.as_deref(),
            ) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("error processing standard '{}': {e}", candidate.name);
                    report.failed += 1;
                    continue;
                }
            };

            if outcome.is_new_standard {
                report.added += 1;
                self.mirror_version(&outcome.version_id, false);
            } else if outcome.created_version {
                report.updated += 1;
                self.mirror_version(&outcome.version_id, true);
            } else {
                // Unchanged content: no version written, no index write,
                // no redundant embedding.
                report.duplicates += 1;
            }
        }

        if let Some(sink) = &self.sink {
            if report.added + report.updated > 0 {
                if let Err(e) = sink.persist() {
                    log::error!("failed to persist semantic index: {e}");
                }
            }
        }

        report
    }

    fn mirror_version(&mut self, version_id: &crate::ids::VersionId, is_update: bool) {
        if let Some(sink) = &self.sink {
            mirror_version(&self.store, sink.as_ref(), version_id, is_update);
        }
    }
}

/// Mirror one accepted version into the semantic index.
///
/// Failures are logged, never propagated: a missing mirror document makes
/// search stale, not the corpus wrong.
pub fn mirror_version(
    store: &VersionStore,
    sink: &dyn VectorIndexSink,
    version_id: &crate::ids::VersionId,
    is_update: bool,
) {
    let version = match store.get_version(version_id) {
        Ok(Some(version)) => version,
        Ok(None) => {
            log::error!("version data not found for {version_id}");
            return;
        }
        Err(e) => {
            log::error!("could not read version {version_id} for mirroring: {e}");
            return;
        }
    };

    let meta = DocumentMeta {
        standard_id: version.standard_id.to_string(),
        version_id: version.version_id.to_string(),
        standard_name: version.standard_name.clone(),
        version_date: version.version_date.clone(),
        source_url: version.source_url.clone(),
        is_update,
    };

    if let Err(e) = sink.add_document(&version.content, meta) {
        log::error!("error mirroring {version_id} into semantic index: {e}");
    } else {
        log::info!(
            "mirrored {}:{version_id} into semantic index{}",
            version.standard_id,
            if is_update { " (update)" } else { "" }
        );
    }
}

/// Run fetch cycles with bounded retries and linear backoff.
///
/// Intended for the scheduled (cron-style) entry point: a total cycle
/// failure is retried up to `attempts` times before surfacing as a
/// terminal error.
pub fn run_with_retries(
    tracker: &mut StandardsTracker,
    attempts: u32,
    backoff: Duration,
) -> anyhow::Result<CycleReport> {
    let attempts = attempts.max(1);

    let mut last_err = None;
    for attempt in 1..=attempts {
        match tracker.run_fetch_cycle() {
            Ok(report) => return Ok(report),
            Err(e) => {
                log::error!("fetch cycle attempt {attempt}/{attempts} failed: {e}");
                last_err = Some(e);
                if attempt < attempts {
                    std::thread::sleep(backoff * attempt);
                }
            }
        }
    }

    Err(last_err.expect("at least one attempt runs"))
}
