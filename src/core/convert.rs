//! Converter invocation: one JSON document in, one intermediate catalog out.
//!
//! The converter is an external program called as
//! `<converter...> <document> <root> <output>`. Exit status 0 means entries
//! were written to `<output>`, 1 means the document holds nothing to
//! translate, anything else is a failure.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::core::error::PipelineError;
use crate::infra::process::{ToolCommand, ToolExit, run_tool};

/// Exit status reserved by converters for "no translatable content"
pub const EMPTY_EXIT_CODE: i32 = 1;

/// Result of a successful converter run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// Entries were written to the intermediate catalog
    Extracted,
    /// Nothing to extract; not an error
    Empty,
}

/// Produces an intermediate catalog for one document.
pub trait Converter {
    fn convert(
        &self,
        document: &Path,
        root: &Path,
        output: &Path,
    ) -> Result<ConvertOutcome, PipelineError>;
}

/// Runs an external converter program and classifies its exit status.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    command: ToolCommand,
    timeout: Option<Duration>,
}

impl ExternalConverter {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Converter for ExternalConverter {
    #[instrument(level = "debug", skip(self, root, output), fields(converter = %self.command))]
    fn convert(
        &self,
        document: &Path,
        root: &Path,
        output: &Path,
    ) -> Result<ConvertOutcome, PipelineError> {
        let exit = run_tool(&self.command, [document, root, output], self.timeout)?;
        classify(&exit, output)
    }
}

/// Map a converter exit onto the outcome contract. A zero exit that left
/// the output empty counts as `Empty` so no blank catalog is produced.
fn classify(exit: &ToolExit, output: &Path) -> Result<ConvertOutcome, PipelineError> {
    match exit.code() {
        Some(0) => {
            let len = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
            if len == 0 {
                debug!("converter succeeded without writing entries");
                Ok(ConvertOutcome::Empty)
            } else {
                Ok(ConvertOutcome::Extracted)
            }
        }
        Some(EMPTY_EXIT_CODE) => Ok(ConvertOutcome::Empty),
        Some(code) => Err(PipelineError::ConversionFailed {
            status: format!("exit {code}"),
            stderr: exit.stderr.clone(),
        }),
        None => Err(PipelineError::ConversionFailed {
            status: "terminated by signal".to_string(),
            stderr: exit.stderr.clone(),
        }),
    }
}
