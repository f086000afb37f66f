//! Clap argument definitions for the `celldex` CLI.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "celldex")]
#[command(about = "Secondary full-text index tools for wide-column rows")]
pub struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported `celldex` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Validate a schema file and list its mapped fields
    Check(CheckCommand),

    /// Show how a field encodes a value
    Encode(EncodeCommand),

    /// Show how a search compiles against a schema
    Explain(ExplainCommand),

    /// Decompose a row into its logical cells
    Extract(ExtractCommand),

    /// Index rows and run a search over them
    Search(SearchCommand),
}

/// Arguments for `celldex check`.
#[derive(Args, Debug, Clone)]
pub struct CheckCommand {
    /// Schema file (TOML or JSON)
    pub schema: PathBuf,

    /// Table layout to validate the schema against
    #[arg(long)]
    pub table: Option<PathBuf>,
}

/// Arguments for `celldex encode`.
#[derive(Args, Debug, Clone)]
pub struct EncodeCommand {
    /// Schema file (TOML or JSON)
    pub schema: PathBuf,

    /// Field name, optionally with a collection sub-name (e.g. attrs.height)
    pub field: String,

    /// Value as JSON; anything that is not valid JSON is taken as a string
    pub value: String,

    /// Encode as a query value instead of an indexed value
    #[arg(long)]
    pub query: bool,
}

/// Where a search document comes from.
#[derive(Args, Debug, Clone)]
pub struct SearchInput {
    /// Search document as JSON
    #[arg(required_unless_present = "file")]
    pub search: Option<String>,

    /// Read the search document from a file
    #[arg(short = 'f', long, conflicts_with = "search")]
    pub file: Option<PathBuf>,
}

/// Arguments for `celldex explain`.
#[derive(Args, Debug, Clone)]
pub struct ExplainCommand {
    /// Schema file (TOML or JSON)
    pub schema: PathBuf,

    /// Search to explain.
    #[command(flatten)]
    pub input: SearchInput,
}

/// Arguments for `celldex extract`.
#[derive(Args, Debug, Clone)]
pub struct ExtractCommand {
    /// Table layout file (TOML or JSON)
    pub table: PathBuf,

    /// Rows file: a JSON row object (partition_key, clustering_key, columns) or an array of them
    pub row: PathBuf,

    /// Also show how a schema encodes each cell
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `celldex search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Schema file (TOML or JSON)
    pub schema: PathBuf,

    /// Table layout file (TOML or JSON)
    pub table: PathBuf,

    /// Search to run.
    #[command(flatten)]
    pub input: SearchInput,

    /// Rows to index before searching (JSON object or array); repeatable
    #[arg(short = 'r', long = "rows")]
    pub rows: Vec<PathBuf>,

    /// Keep the index in this directory instead of memory
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Maximum hits to return
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
