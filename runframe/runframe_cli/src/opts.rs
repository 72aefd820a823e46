#![deny(missing_docs)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use cli::parsers::{duration_ms_parser, key_value_parser};
use runframe_app::eval_version::LATEST;

use crate::registry::NPM_REGISTRY_URL;

#[derive(Parser, Debug)]
#[command(name = "runframe_cli")]
#[command(bin_name = "runframe_cli")]
#[command(version, about, long_about = None)]
pub(crate) struct Opts {
    #[command(subcommand)]
    pub(crate) command: ModeCommand,

    /// Trace log file
    #[arg(long, num_args = 0..=1, default_missing_value = "trace.log")]
    pub(crate) trace: Option<PathBuf>,

    /// Config file, JSON
    #[arg(long, value_name = "CONFIG_FILE")]
    pub(crate) config: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum ModeCommand {
    /// Fold edit events into a manual edits file
    ApplyEdits {
        /// Edit events, a JSON array
        #[arg(long, value_name = "EVENTS_FILE")]
        events: PathBuf,

        /// Circuit output of the last render, a JSON array, used to resolve component ids
        #[arg(long, value_name = "CIRCUIT_FILE")]
        circuit: PathBuf,

        /// Manual edits file, local path or the path on the file server
        #[arg(long, value_name = "MANUAL_EDITS_FILE")]
        manual_edits: Option<String>,

        /// File server base URL, e.g. 'http://localhost:3020'
        #[arg(long, value_name = "URL")]
        server: Option<String>,
    },
    /// Print the render completed payload
    Payload {
        /// Circuit output, a JSON array
        #[arg(long, value_name = "CIRCUIT_FILE")]
        circuit: Option<PathBuf>,

        /// Execution error, e.g. 'TypeError=x is undefined'
        #[arg(long, value_name = "NAME=MESSAGE", value_parser = key_value_parser)]
        execution_error: Option<(String, String)>,
    },
    /// Download the file map from a file server
    Sync {
        /// File server base URL, e.g. 'http://localhost:3020'
        #[arg(long, value_name = "URL")]
        server: String,

        /// A previously synced file map, unchanged files are not fetched again
        #[arg(long, value_name = "FS_MAP_FILE")]
        cache: Option<PathBuf>,

        /// Paths to fetch again even when cached
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        changed: Vec<String>,

        /// Where to write the file map, JSON
        #[arg(long, value_name = "FS_MAP_FILE")]
        output: PathBuf,
    },
    /// Resolve the evaluator version
    ResolveVersion {
        /// A concrete version, or 'latest'
        #[arg(long, default_value = LATEST)]
        version: String,

        /// Ignore the cached 'latest' version
        #[arg(long)]
        force_latest: bool,

        /// Package registry base URL
        #[arg(long, value_name = "URL", default_value = NPM_REGISTRY_URL)]
        registry: String,
    },
    /// Replay edit events against a project directory, persisting and re-rendering like an interactive session
    Replay {
        /// Project directory
        #[arg(long, default_value = ".")]
        project: PathBuf,

        /// Edit events, a JSON array
        #[arg(long, value_name = "EVENTS_FILE")]
        events: PathBuf,

        /// Circuit output produced by every render, a JSON array
        #[arg(long, value_name = "CIRCUIT_FILE")]
        circuit: PathBuf,

        /// Delay between consecutive edit events, in milliseconds
        #[arg(long, value_name = "MILLISECONDS", value_parser = duration_ms_parser, default_value = "0")]
        interval: Duration,

        /// Debounce delay in milliseconds, overrides the config
        #[arg(long, value_name = "MILLISECONDS", value_parser = duration_ms_parser)]
        debounce: Option<Duration>,

        /// Do not render after persisting finished edits
        #[arg(long)]
        no_auto_render: bool,
    },
}
