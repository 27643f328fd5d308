//! **jsonpot** - Build-time extraction of translatable strings from JSON definitions
//!
//! Walks a tree of JSON documents, hands each one to an external converter,
//! deduplicates the result and places one gettext template per document in a
//! destination directory. Temp files never outlive their document.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - convert, deduplicate, materialize
pub mod core {
    /// Error taxonomy and severity (per-document vs fatal)
    pub mod error;
    pub use error::{PipelineError, Severity};

    /// External converter contract (exit 0 = entries, 1 = empty)
    pub mod convert;
    pub use convert::{ConvertOutcome, Converter, ExternalConverter};

    /// msguniq and builtin (polib) deduplicators
    pub mod dedup;
    pub use dedup::{BuiltinDedup, DedupOutcome, Deduplicator, Msguniq};

    /// Atomic rename of finished catalogs into the destination
    pub mod materialize;
    pub use materialize::{Materializer, catalog_file_name};

    /// Walker-driven orchestration and run summary
    pub mod pipeline;
    pub use pipeline::{DocumentOutcome, Pipeline, RunSummary, run};
}

/// Infrastructure - Configuration, traversal, and external processes
pub mod infra {
    /// Configuration management with TOML support and env overrides
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Recursive JSON discovery with pluggable exclusion
    pub mod walk;
    pub use walk::{ExclusionPolicy, FileWalker, SegmentExclusion, WalkItem};

    /// Blocking tool runner with optional timeout
    pub mod process;
    pub use process::{ToolCommand, ToolExit, run_tool};
}

// Strategic re-exports for clean CLI interface
pub use crate::cli::{AppContext, Cli, Commands};
pub use crate::core::{Pipeline, PipelineError, RunSummary};
pub use crate::infra::{Config, FileWalker, load_config};
