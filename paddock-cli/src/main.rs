//! paddock CLI: integrity checks for partitioned race datasets.
//!
//! Every subcommand prints a JSON report (or writes it with `--output`).
//! `run` executes the configured suite and exits non-zero when a check fails.

mod commands;

use clap::Parser;
use paddock_core::DatasetKind;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// paddock: verify scraped race data before it reaches a model
#[derive(Parser, Debug)]
#[command(name = "paddock", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (where paddock.toml is looked up)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path, merged over all other layers
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compare column sets across the partitions of one dataset
    Schema {
        /// Partition files or dataset directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Date range and gap dates of a date column
    Coverage {
        /// Partition file or dataset directory
        path: PathBuf,
        /// Date column name
        #[arg(long, default_value = "race_date")]
        column: String,
        /// Additional known non-event date (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },
    /// Decode race identifiers (YYYYPPNNDDRR)
    Decode {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Check the race identifier format of every value in a column
    Ids {
        /// Partition file or dataset directory
        path: PathBuf,
        /// Identifier column name
        #[arg(long, default_value = "race_id")]
        column: String,
    },
    /// Check a model's feature manifest for outcome columns
    Leakage {
        /// JSON sidecar or LightGBM text model
        manifest: PathBuf,
        /// Additional forbidden column (repeatable)
        #[arg(long = "forbid")]
        forbid: Vec<String>,
    },
    /// Diff a model's feature manifest against a feature partition's columns
    ManifestDiff {
        manifest: PathBuf,
        /// Feature partition file or directory (first partition is used)
        partition: PathBuf,
    },
    /// Per-key row counts across partitions
    Counts {
        /// Partition files or dataset directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Grouping key column
        #[arg(long, default_value = "race_id")]
        key: String,
        /// File with one expected key per line
        #[arg(long)]
        expected: Option<PathBuf>,
    },
    /// Check that partitions carry the required columns of a dataset
    Required {
        /// Partition file or dataset directory
        path: PathBuf,
        /// Dataset whose configured required columns are used
        #[arg(long, conflicts_with = "columns")]
        dataset: Option<DatasetKind>,
        /// Explicit required columns (comma separated)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Null counts, missing rates and numeric dtypes of a dataset
    Quality {
        /// Partition files or dataset directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Dataset whose configured rules are used
        #[arg(long)]
        dataset: DatasetKind,
    },
    /// Race-result consistency rules (position, distance, finish time)
    Consistency {
        /// Partition files or dataset directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Run the configured check suite
    Run {
        /// Restrict to these datasets (repeatable)
        #[arg(long = "dataset")]
        datasets: Vec<DatasetKind>,
        /// Report format: json or markdown
        #[arg(long, default_value = "json")]
        format: paddock_core::ReportFormat,
        /// Exit non-zero on warnings as well as failures
        #[arg(long)]
        strict: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default paddock.toml into the workspace
    Init,
    /// Show the merged configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "paddock", "paddock")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "paddock.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());

    let ctx = commands::Context {
        workspace,
        config_path: cli.config,
        output: cli.output,
        quiet: cli.quiet,
    };
    let clean = commands::handle_command(cli.command, &ctx).await?;
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
