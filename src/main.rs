use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod diff;
mod fetcher;
mod ids;
mod lock;
mod models;
mod semantic;
mod similarity;
mod storage;
#[cfg(test)]
mod tests;
mod tracker;
mod version_store;

use cli::Command;
use config::Config;
use fetcher::{DdgSearch, NewsFetcher};
use lock::FileLock;
use semantic::{EmbeddingModel, SemanticIndexService, VectorIndexSink};
use similarity::{SimilarityOracle, TextEmbedder};
use tracker::StandardsTracker;
use version_store::VersionStore;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = Config::load_with(&args.dir);

    match args.command {
        Command::Fetch {
            retries,
            backoff_secs,
            no_semantic,
        } => {
            let _lock = FileLock::try_acquire(Path::new(config.base_path()))?;

            let (oracle, sink) = embedding_stack(&config, no_semantic);
            let store = open_store(&config, oracle)?;

            let provider = DdgSearch::new(Duration::from_secs(config.request_timeout_secs))?;
            let fetcher = NewsFetcher::new(
                Box::new(provider),
                config.tracked_standards.clone(),
                config.general_queries.clone(),
                config.max_search_results,
            );

            let mut tracker = StandardsTracker::new(fetcher, store, sink);
            let report = tracker::run_with_retries(
                &mut tracker,
                retries.unwrap_or(config.fetch_attempts),
                Duration::from_secs(backoff_secs.unwrap_or(config.fetch_backoff_secs)),
            )?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Command::Standards {} => {
            let store = open_store(&config, SimilarityOracle::lexical())?;
            let standards = store.get_all_standards()?;
            println!("{}", serde_json::to_string_pretty(&standards)?);
            Ok(())
        }

        Command::Standard { id } => {
            let store = open_store(&config, SimilarityOracle::lexical())?;
            let standard_id = id.as_str().into();
            let Some(entry) = store.get_standard(&standard_id) else {
                bail!("standard {id} not found");
            };

            let mut value = serde_json::to_value(entry)?;
            value["id"] = serde_json::json!(standard_id);
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }

        Command::Versions { standard_id } => {
            let store = open_store(&config, SimilarityOracle::lexical())?;
            let versions = store.get_standard_versions(&standard_id.as_str().into())?;
            println!("{}", serde_json::to_string_pretty(&versions)?);
            Ok(())
        }

        Command::Version { version_id } => {
            let store = open_store(&config, SimilarityOracle::lexical())?;
            let Some(version) = store.get_version(&version_id.as_str().into())? else {
                bail!("version {version_id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&version)?);
            Ok(())
        }

        Command::Changes { version_id } => {
            let store = open_store(&config, SimilarityOracle::lexical())?;
            let Some(change) = store.get_version_changes(&version_id.as_str().into())? else {
                bail!("no change record for version {version_id}");
            };
            println!("{}", serde_json::to_string_pretty(&change)?);
            Ok(())
        }

        Command::Search {
            query,
            limit,
            threshold,
        } => {
            let model = load_model(&config)?;
            let service = SemanticIndexService::new(model, semantic_path(&config));

            let results = service.search(
                &query,
                threshold.unwrap_or(config.semantic.search_threshold),
                limit,
            )?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }

        Command::Add {
            name,
            file,
            url,
            no_semantic,
        } => {
            let content = match file {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let _lock = FileLock::try_acquire(Path::new(config.base_path()))?;

            let (oracle, sink) = embedding_stack(&config, no_semantic);
            let mut store = open_store(&config, oracle)?;

            let outcome = store.add_standard(&name, &content, url.as_deref())?;

            if let Some(sink) = &sink {
                if outcome.created_version {
                    tracker::mirror_version(
                        &store,
                        sink.as_ref(),
                        &outcome.version_id,
                        !outcome.is_new_standard,
                    );
                    if let Err(e) = sink.persist() {
                        log::error!("failed to persist semantic index: {e}");
                    }
                }
            }

            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
    }
}

fn open_store(config: &Config, oracle: SimilarityOracle) -> anyhow::Result<VersionStore> {
    Ok(VersionStore::open(
        &config.versions_dir(),
        &config.changes_dir(),
        oracle,
        config.similarity_threshold,
    )?)
}

fn semantic_path(config: &Config) -> PathBuf {
    PathBuf::from(config.semantic_dir())
}

fn load_model(config: &Config) -> anyhow::Result<Arc<dyn TextEmbedder>> {
    let model = EmbeddingModel::new(&config.semantic.model, semantic_path(config))?;
    Ok(Arc::new(model))
}

/// Build the similarity oracle and the optional semantic mirror around a
/// single shared embedding model.
///
/// A model that fails to load degrades the whole stack instead of
/// aborting: similarity falls back to lexical scoring and the mirror is
/// skipped for this run.
fn embedding_stack(
    config: &Config,
    no_semantic: bool,
) -> (SimilarityOracle, Option<Box<dyn VectorIndexSink>>) {
    match load_model(config) {
        Ok(model) => {
            let oracle = SimilarityOracle::with_embedder(model.clone());
            let sink: Option<Box<dyn VectorIndexSink>> = if no_semantic {
                None
            } else {
                Some(Box::new(SemanticIndexService::new(
                    model,
                    semantic_path(config),
                )))
            };
            (oracle, sink)
        }
        Err(e) => {
            log::warn!("embedding model unavailable, using lexical similarity only: {e}");
            (SimilarityOracle::lexical(), None)
        }
    }
}
