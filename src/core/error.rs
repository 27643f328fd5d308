//! Error taxonomy for the extraction pipeline.
//!
//! An empty extraction is not an error and never appears here; it is a
//! regular outcome of the converter and deduplicator stages.

use std::path::PathBuf;
use std::time::Duration;

/// Whether an error stops the whole run or only the current document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity
{
    /// Recorded against the document; the walk continues
    Document,
    /// Aborts the run
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError
{
    #[error("cannot read source root {}: {source}", .path.display())]
    RootUnreadable
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write destination {}: {source}", .path.display())]
    Destination
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn
    {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {after:?}")]
    TimedOut
    {
        program: String,
        after: Duration,
    },

    #[error("converter failed ({status}){}", detail(.stderr))]
    ConversionFailed
    {
        status: String,
        stderr: String,
    },

    #[error("deduplication failed ({status}){}", detail(.stderr))]
    DedupFailed
    {
        status: String,
        stderr: String,
    },

    #[error("traversal error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError
{
    pub fn severity(&self) -> Severity
    {
        match self
        {
            Self::RootUnreadable { .. } | Self::Destination { .. } => Severity::Fatal,
            _ => Severity::Document,
        }
    }

    pub fn is_fatal(&self) -> bool
    {
        self.severity() == Severity::Fatal
    }
}

fn detail(stderr: &str) -> String
{
    if stderr.is_empty() { String::new() } else { format!(": {stderr}") }
}
