//! CLI argument definitions for datasim.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `generate` | Submit a generation job and wait for it to finish |
//! | `stream` | Print the latest generated artifact as it streams in |
//! | `tables` | Browse generated tables on the backend |
//! | `history` | Manage locally saved schema documents |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--api-url` | `http://localhost:8000` | Backend base URL (`DATASIM_API_URL`) |
//! | `--data-dir` | `.datasim` | Directory holding the schema catalog |
//! | `--poll-interval-ms` | `1000` | Delay between job status queries |
//! | `--timeout-ms` | `30000` | Per-request timeout for non-streaming calls |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! datasim generate --schema customers.json --records 500 --storage blob_storage
//! datasim stream --format json
//! datasim tables content synthetic_customers --limit 20 --csv
//! datasim history add customers.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use datasim_core::catalog::DEFAULT_CONTENT_LIMIT;
use datasim_core::{OutputFormat, StorageOption, StreamFormat};

/// datasim - synthetic data generation client
///
/// Submits schema-driven generation jobs to the datasim backend, follows
/// them to completion, and reads back the generated artifacts and tables.
#[derive(Debug, Parser)]
#[command(name = "datasim", author, version, about = "Synthetic data generation client")]
pub struct Cli {
    /// Backend base URL.
    #[arg(long, global = true, env = "DATASIM_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the local schema catalog.
    #[arg(long, global = true, env = "DATASIM_DATA_DIR", default_value = ".datasim")]
    pub data_dir: PathBuf,

    /// Delay between job status queries, in milliseconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,

    /// Per-request timeout in milliseconds. Streaming reads are never cut short.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a generation job and wait for its final status.
    ///
    /// Progress is logged to stderr; the final job is printed to stdout.
    ///
    /// # Examples
    ///
    ///   datasim generate --schema customers.json --records 1000 --storage azure_sql
    ///   datasim generate --history 6f1c... --format json --storage both --show
    Generate(GenerateArgs),

    /// Print a generated artifact as it streams from the backend.
    ///
    /// # Examples
    ///
    ///   datasim stream --format csv
    ///   datasim stream --snapshot result.json
    Stream(StreamArgs),

    /// Browse generated tables.
    Tables(TablesArgs),

    /// Manage saved schema documents.
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Schema document to generate from (`-` reads stdin).
    #[arg(long, required_unless_present = "history", conflicts_with = "history")]
    pub schema: Option<PathBuf>,

    /// Id of a saved schema document to generate from.
    #[arg(long)]
    pub history: Option<String>,

    /// Number of records to generate (1-100000).
    #[arg(long, default_value_t = 100)]
    pub records: u32,

    /// Output file format: csv, json or both.
    #[arg(long, default_value = "csv")]
    pub format: OutputFormat,

    /// Storage target: azure_sql, blob_storage or both.
    #[arg(long)]
    pub storage: Option<StorageOption>,

    /// Give up polling after this many milliseconds.
    #[arg(long, env = "DATASIM_POLL_DEADLINE_MS")]
    pub deadline_ms: Option<u64>,

    /// Stream the generated artifact to stdout once the job succeeds.
    #[arg(long, default_value_t = false)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct StreamArgs {
    /// Artifact encoding to read: csv or json.
    #[arg(long, default_value = "csv")]
    pub format: StreamFormat,

    /// Render a local JSON file instead of reading from the backend.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TablesArgs {
    #[command(subcommand)]
    pub command: TablesCommand,
}

#[derive(Debug, Subcommand)]
pub enum TablesCommand {
    /// List generated tables.
    List,

    /// Show rows of a generated table.
    Content {
        /// Table name, including the `synthetic_` prefix.
        table: String,

        /// Maximum rows to fetch (clamped to 1-1000).
        #[arg(long, default_value_t = DEFAULT_CONTENT_LIMIT)]
        limit: u32,

        /// Render rows as quoted delimited text instead of JSON.
        #[arg(long, default_value_t = false)]
        csv: bool,
    },

    /// Show the column layout of a generated table.
    Schema {
        /// Table name, including the `synthetic_` prefix.
        table: String,
    },
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List saved schema documents.
    List,

    /// Save a schema document.
    Add {
        /// File to save (`-` reads stdin).
        file: PathBuf,

        /// Display name. Defaults to the document's table name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a saved schema document.
    Remove {
        /// Entry id as shown by `history list`.
        id: String,
    },
}
