use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "jsonpot")]
#[command(
    about = "Extract translatable strings from JSON definition files into gettext catalog templates"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every JSON document under a root into one catalog per document
    Run(RunArgs),

    /// Initialize a jsonpot.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Root directory to scan for JSON documents
    pub source_root: PathBuf,

    /// Directory receiving one catalog file per document
    pub destination: PathBuf,

    /// Converter program (overrides `converter` from config)
    #[arg(long)]
    pub converter: Option<String>,

    /// Leading argument for the converter program (repeatable)
    #[arg(long = "converter-arg", requires = "converter", allow_hyphen_values = true)]
    pub converter_args: Vec<String>,

    /// Deduplicator backend
    #[arg(long, value_enum)]
    pub dedup: Option<DedupBackend>,

    /// Additional path segment to exclude (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Timeout in seconds for each external tool invocation
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Which deduplicator normalizes intermediate catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupBackend {
    /// gettext's `msguniq --to-code=UTF-8`
    #[default]
    Msguniq,
    /// In-process merge, first occurrence wins
    Builtin,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
