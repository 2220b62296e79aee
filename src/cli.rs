use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Tracks security standards updates and versions", long_about = None)]
pub struct Args {
    /// Data directory (config, version store, semantic index)
    #[clap(long, global = true, env = "STDWATCH_DIR", default_value = "./stdwatch-data")]
    pub dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one fetch-and-update cycle
    Fetch {
        /// Retry attempts for a failed cycle (overrides config)
        #[clap(long)]
        retries: Option<u32>,

        /// Base backoff between retries in seconds (overrides config)
        #[clap(long)]
        backoff_secs: Option<u64>,

        /// Skip the semantic index mirror (version store only)
        #[clap(long, default_value = "false")]
        no_semantic: bool,
    },

    /// List all tracked standards
    Standards {},

    /// Show one standard's index entry
    Standard {
        /// Standard id (std_...)
        id: String,
    },

    /// List all versions of a standard, newest first
    Versions {
        /// Standard id (std_...)
        standard_id: String,
    },

    /// Show a full version record
    Version {
        /// Version id (v_...)
        version_id: String,
    },

    /// Show the change record for a version
    Changes {
        /// Version id (v_...)
        version_id: String,
    },

    /// Semantic search over the mirrored standards corpus
    Search {
        query: String,

        /// Maximum results
        #[clap(short, long, default_value = "10")]
        limit: usize,

        /// Minimum similarity score (overrides config)
        #[clap(short, long)]
        threshold: Option<f32>,
    },

    /// Manually ingest content for a standard
    Add {
        /// Standard name (e.g. "PCI DSS")
        name: String,

        /// Read content from this file instead of stdin
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Source URL recorded on the version
        #[clap(short, long)]
        url: Option<String>,

        /// Skip the semantic index mirror
        #[clap(long, default_value = "false")]
        no_semantic: bool,
    },
}
