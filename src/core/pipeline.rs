//! Walk a source tree and turn every JSON document into its own catalog.
//!
//! Per document: convert into a private temp catalog, deduplicate into a
//! staging file inside the destination, rename into place. Temp files are
//! RAII guards, so every exit path (empty result, failure, success) leaves
//! nothing behind. Only root and destination errors stop the walk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::{debug, warn};

use crate::cli::{AppContext, DedupBackend, RunArgs};
use crate::core::convert::{ConvertOutcome, Converter, ExternalConverter};
use crate::core::dedup::{BuiltinDedup, DedupOutcome, Deduplicator, Msguniq};
use crate::core::error::PipelineError;
use crate::core::materialize::{Materializer, TEMP_PREFIX};
use crate::infra::config::{Config, load_config};
use crate::infra::process::ToolCommand;
use crate::infra::walk::{FileWalker, SegmentExclusion, WalkItem};

/// Terminal state of one document that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Catalog written to the contained path
    Materialized(PathBuf),
    /// Nothing to translate; no catalog written, none removed
    Empty,
}

/// What happened during one run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub materialized: Vec<PathBuf>,
    pub empty: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub walk_errors: Vec<String>,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.empty.len() + self.excluded.len()
    }

    pub fn errored(&self) -> usize {
        self.failed.len() + self.walk_errors.len()
    }

    /// One-line report, optionally colored
    pub fn render(&self, color: bool) -> String {
        let written = self.materialized.len();
        let noun = if written == 1 { "catalog" } else { "catalogs" };
        let produced = format!("{written} {noun} written");
        let skipped = format!(
            "{} skipped ({} empty, {} excluded)",
            self.skipped(),
            self.empty.len(),
            self.excluded.len()
        );
        let errored = format!("{} failed", self.errored());

        if color {
            format!("{}, {}, {}", produced.green(), skipped.yellow(), errored.red())
        } else {
            format!("{produced}, {skipped}, {errored}")
        }
    }
}

/// Converter -> deduplicator -> materializer, driven by a walker
pub struct Pipeline {
    walker: FileWalker,
    converter: Box<dyn Converter>,
    dedup: Box<dyn Deduplicator>,
    materializer: Materializer,
}

impl Pipeline {
    pub fn new(
        walker: FileWalker,
        converter: Box<dyn Converter>,
        dedup: Box<dyn Deduplicator>,
        materializer: Materializer,
    ) -> Self {
        Self {
            walker,
            converter,
            dedup,
            materializer,
        }
    }

    /// Assemble the pipeline described by `config`, writing into `destination`.
    pub fn from_config(config: &Config, destination: &Path) -> Result<Self> {
        let command = ToolCommand::from_argv(&config.converter).context(
            "no converter configured; pass --converter or set `converter` in jsonpot.toml",
        )?;
        let converter = ExternalConverter::new(command).with_timeout(config.timeout());

        let dedup: Box<dyn Deduplicator> = match config.dedup {
            DedupBackend::Msguniq => {
                Box::new(Msguniq::new(&config.msguniq).with_timeout(config.timeout()))
            }
            DedupBackend::Builtin => Box::new(BuiltinDedup),
        };

        let walker = FileWalker::new(std::slice::from_ref(&config.include_pattern))?
            .with_exclusion(SegmentExclusion::new(config.exclude_segments.iter()))
            .with_follow_symlinks(config.follow_symlinks);

        let materializer = Materializer::new(destination, config.catalog_suffix.as_str());

        Ok(Self::new(walker, Box::new(converter), dedup, materializer))
    }

    pub fn walker(&self) -> &FileWalker {
        &self.walker
    }

    /// Run one document through every stage.
    pub fn process_document(
        &self,
        document: &Path,
        root: &Path,
    ) -> Result<DocumentOutcome, PipelineError> {
        debug!(document = %document.display(), "extracting");
        let intermediate = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".pot")
            .tempfile()?;

        match self
            .converter
            .convert(document, root, intermediate.path())?
        {
            ConvertOutcome::Empty => {
                debug!(document = %document.display(), "nothing to translate");
                return Ok(DocumentOutcome::Empty);
            }
            ConvertOutcome::Extracted => {}
        }

        debug!(document = %document.display(), "deduplicating");
        let staged = self.materializer.staging_file()?;
        match self.dedup.dedup(intermediate.path(), staged.path())? {
            DedupOutcome::Empty => {
                debug!(document = %document.display(), "no entries after deduplication");
                return Ok(DocumentOutcome::Empty);
            }
            DedupOutcome::Deduplicated => {}
        }

        let target = self.materializer.materialize(staged, document)?;
        Ok(DocumentOutcome::Materialized(target))
    }

    /// Walk `root` and process every selected document. Per-document errors
    /// are collected in the summary; root and destination errors abort.
    pub fn run(&self, root: &Path, progress: &ProgressBar) -> Result<RunSummary, PipelineError> {
        let root = dunce::canonicalize(root).map_err(|source| PipelineError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
        self.materializer.prepare()?;

        let mut summary = RunSummary::default();

        for item in self.walker.walk(&root)? {
            match item {
                WalkItem::Document(document) => {
                    progress.set_message(document.display().to_string());
                    match self.process_document(&document, &root) {
                        Ok(DocumentOutcome::Materialized(path)) => {
                            summary.materialized.push(path);
                        }
                        Ok(DocumentOutcome::Empty) => summary.empty.push(document),
                        Err(err) if err.is_fatal() => return Err(err),
                        Err(err) => {
                            warn!(document = %document.display(), error = %err, "skipping document");
                            summary.failed.push((document, err.to_string()));
                        }
                    }
                    progress.inc(1);
                }
                WalkItem::Excluded(document) => {
                    debug!(document = %document.display(), "excluded fixture");
                    summary.excluded.push(document);
                }
                WalkItem::Error(err) => {
                    let err = PipelineError::from(err);
                    warn!(error = %err, "skipping unreadable entry");
                    summary.walk_errors.push(err.to_string());
                }
            }
        }

        Ok(summary)
    }
}

/// `jsonpot run <source-root> <destination>`
pub fn run(args: RunArgs, ctx: &AppContext) -> Result<()> {
    let mut config = load_config()?;
    config.apply_args(&args);

    let pipeline = Pipeline::from_config(&config, &args.destination)?;

    if ctx.dry_run {
        let items = pipeline
            .walker()
            .walk(&args.source_root)
            .with_context(|| format!("scanning {}", args.source_root.display()))?;
        if !ctx.quiet {
            println!("DRY RUN: would convert into {}:", args.destination.display());
            for item in items {
                match item {
                    WalkItem::Document(p) => println!("  {}", p.display()),
                    WalkItem::Excluded(p) => println!("  {} (excluded)", p.display()),
                    WalkItem::Error(e) => println!("  error: {e}"),
                }
            }
        }
        return Ok(());
    }

    let progress = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} documents {msg}")?,
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let summary = pipeline.run(&args.source_root, &progress)?;
    progress.finish_and_clear();

    if !ctx.quiet {
        for (document, reason) in &summary.failed {
            eprintln!("failed: {}: {reason}", document.display());
        }
        println!("{}", summary.render(!ctx.no_color));
    }

    Ok(())
}
