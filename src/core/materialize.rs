//! Final placement of catalogs.
//!
//! Catalogs are staged in a temp file inside the destination directory and
//! renamed over `<destination>/<document file name>.<suffix>`, so readers see
//! either the previous catalog or the complete new one.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::core::error::PipelineError;

/// Prefix shared by every temp file this tool creates
pub const TEMP_PREFIX: &str = ".jsonpot-";

/// `a.json` + `pot` -> `a.json.pot`. None for paths without a file name.
pub fn catalog_file_name(document: &Path, suffix: &str) -> Option<OsString> {
    let mut name = document.file_name()?.to_os_string();
    name.push(".");
    name.push(suffix);
    Some(name)
}

#[derive(Debug, Clone)]
pub struct Materializer {
    destination: PathBuf,
    suffix: String,
}

impl Materializer {
    pub fn new(destination: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            suffix: suffix.into(),
        }
    }

    /// Create the destination directory if needed.
    pub fn prepare(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.destination).map_err(|source| self.destination_error(source))
    }

    /// Where the catalog for `document` ends up.
    pub fn final_path(&self, document: &Path) -> Result<PathBuf, PipelineError> {
        let name = catalog_file_name(document, &self.suffix).ok_or_else(|| {
            PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", document.display()),
            ))
        })?;
        Ok(self.destination.join(name))
    }

    /// Fresh, exclusively created staging file on the destination's
    /// filesystem. Removed on drop unless materialized.
    pub fn staging_file(&self) -> Result<NamedTempFile, PipelineError> {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.destination)
            .map_err(|source| self.destination_error(source))
    }

    /// Rename `staged` into place for `document`, replacing any previous
    /// catalog.
    pub fn materialize(
        &self,
        staged: NamedTempFile,
        document: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let target = self.final_path(document)?;

        staged
            .as_file()
            .sync_all()
            .map_err(|source| self.destination_error(source))?;

        // Staging files are created 0600; catalogs are meant to be shared
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o644))
                .map_err(|source| self.destination_error(source))?;
        }

        debug!(from = %staged.path().display(), to = %target.display(), "renaming into place");
        staged
            .persist(&target)
            .map_err(|e| self.destination_error(e.error))?;

        info!(catalog = %target.display(), "materialized");
        Ok(target)
    }

    fn destination_error(&self, source: std::io::Error) -> PipelineError {
        PipelineError::Destination {
            path: self.destination.clone(),
            source,
        }
    }
}
