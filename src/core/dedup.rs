//! Deduplication of intermediate catalogs.
//!
//! Two backends: gettext's `msguniq` (re-encodes to UTF-8 and merges
//! duplicate msgids) and an in-process merge that writes through `polib`.
//! Both leave the output empty when there is nothing to keep, which callers
//! treat as "no catalog" rather than as an error.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use polib::po_file;
use tracing::{debug, instrument};

use crate::core::error::PipelineError;
use crate::core::materialize::TEMP_PREFIX;
use crate::infra::process::{ToolCommand, run_tool};

const UTF8_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";
const DEFAULT_PLURAL_FORMS: &str = "nplurals=2; plural=(n != 1);";

/// Header keys `polib` requires, in gettext order, with the value written
/// when the intermediate catalog leaves one out.
const HEADER_DEFAULTS: [(&str, &str); 10] = [
    ("Project-Id-Version", "PACKAGE VERSION"),
    ("POT-Creation-Date", ""),
    ("PO-Revision-Date", ""),
    ("Last-Translator", ""),
    ("Language-Team", ""),
    ("MIME-Version", "1.0"),
    ("Content-Type", UTF8_CONTENT_TYPE),
    ("Content-Transfer-Encoding", "8bit"),
    ("Language", ""),
    ("Plural-Forms", DEFAULT_PLURAL_FORMS),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// A merged catalog was written to the output path
    Deduplicated,
    /// No entries survived; the output must not be materialized
    Empty,
}

/// Normalizes one intermediate catalog into `output`.
pub trait Deduplicator {
    fn dedup(&self, input: &Path, output: &Path) -> Result<DedupOutcome, PipelineError>;
}

/// `msguniq --to-code=UTF-8 -o <output> <input>`
#[derive(Debug, Clone)]
pub struct Msguniq {
    command: ToolCommand,
    timeout: Option<Duration>,
}

impl Msguniq {
    pub fn new(program: &str) -> Self {
        Self {
            command: ToolCommand::new(program).arg("--to-code=UTF-8"),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Deduplicator for Msguniq {
    #[instrument(level = "debug", skip(self, output))]
    fn dedup(&self, input: &Path, output: &Path) -> Result<DedupOutcome, PipelineError> {
        let exit = run_tool(
            &self.command,
            [Path::new("-o").as_os_str(), output.as_os_str(), input.as_os_str()],
            self.timeout,
        )?;

        if !exit.status.success() {
            // A staging file we can no longer write means the destination
            // is broken, not the document
            if let Err(source) = OpenOptions::new().write(true).create(true).open(output) {
                return Err(output_error(output, source));
            }

            let status = match exit.code() {
                Some(code) => format!("exit {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(PipelineError::DedupFailed {
                status,
                stderr: exit.stderr,
            });
        }

        output_outcome(output)
    }
}

/// In-process merge on `(msgctxt, msgid)`.
///
/// The first occurrence keeps its msgstr and flags; source references and
/// extracted comments of later duplicates are appended without repeats.
/// The header is completed with the keys gettext expects and its charset
/// forced to UTF-8. Input must already be UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDedup;

/// Which quoted field continuation lines belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    Str,
    Other,
}

/// One blank-line separated block of a PO file, kept in its escaped form
#[derive(Debug, Default)]
struct RawEntry {
    msgctxt: String,
    msgid: Option<String>,
    msgstr: String,
    comments: IndexSet<String>,
    sources: IndexSet<String>,
    /// Every other line (flags, translator comments, msg* keywords) verbatim
    body: Vec<String>,
}

impl RawEntry {
    fn parse(block: &[&str]) -> Self {
        let mut entry = Self::default();
        let mut field = Field::Other;

        for line in block {
            if let Some(rest) = line.strip_prefix("#.") {
                let comment = rest.trim();
                if !comment.is_empty() {
                    entry.comments.insert(comment.to_string());
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("#:") {
                entry
                    .sources
                    .extend(rest.split_whitespace().map(str::to_string));
                continue;
            }

            entry.body.push(line.to_string());

            if line.starts_with('"') {
                let text = unquote(line);
                match field {
                    Field::Context => entry.msgctxt.push_str(text),
                    Field::Id => entry.msgid.get_or_insert_with(String::new).push_str(text),
                    Field::Str => entry.msgstr.push_str(text),
                    Field::Other => {}
                }
            } else if let Some(rest) = line.strip_prefix("msgctxt ") {
                entry.msgctxt.push_str(unquote(rest));
                field = Field::Context;
            } else if let Some(rest) = line.strip_prefix("msgid ") {
                entry.msgid = Some(unquote(rest).to_string());
                field = Field::Id;
            } else if let Some(rest) = line.strip_prefix("msgstr ") {
                entry.msgstr.push_str(unquote(rest));
                field = Field::Str;
            } else {
                field = Field::Other;
            }
        }

        entry
    }

    fn is_header(&self) -> bool {
        self.msgctxt.is_empty() && self.msgid.as_deref() == Some("")
    }

    fn key(&self) -> (String, String) {
        (self.msgctxt.clone(), self.msgid.clone().unwrap_or_default())
    }

    fn absorb(&mut self, later: RawEntry) {
        self.comments.extend(later.comments);
        self.sources.extend(later.sources);
    }

    fn render(&self, out: &mut String) {
        for comment in &self.comments {
            out.push_str(&format!("#. {comment}\n"));
        }
        for source in &self.sources {
            out.push_str(&format!("#: {source}\n"));
        }
        for line in &self.body {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Header msgstr with every required key present. `raw` is the escaped
/// msgstr of the original header, or empty when there was none.
fn normalized_header(raw: &str) -> String {
    let fields: IndexMap<&str, &str> = raw
        .split("\\n")
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();

    let mut header = String::from("msgid \"\"\nmsgstr \"\"\n");
    for (key, default) in HEADER_DEFAULTS {
        let value = match key {
            "Content-Type" => UTF8_CONTENT_TYPE,
            "Plural-Forms" => fields
                .get(key)
                .copied()
                .filter(|v| plural_forms_usable(v))
                .unwrap_or(default),
            _ => fields.get(key).copied().unwrap_or(default),
        };
        header.push_str(&format!("\"{key}: {value}\\n\"\n"));
    }
    header.push('\n');
    header
}

/// Whether `polib` accepts `rules`; template placeholders such as
/// `nplurals=INTEGER` are not.
fn plural_forms_usable(rules: &str) -> bool {
    let mut nplurals = false;
    let mut expr = false;
    for rule in rules.split(';').map(str::trim).filter(|r| !r.is_empty()) {
        match rule.split_once('=') {
            Some(("nplurals", n)) => nplurals = n.parse::<usize>().is_ok_and(|n| n > 0),
            Some(("plural", e)) => expr = !e.is_empty(),
            _ => return false,
        }
    }
    nplurals && expr
}

/// Merge duplicate entries of a PO text, preserving first-seen order.
/// Returns None when the text holds no entries besides the header.
fn merge_duplicates(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().map(|l| l.trim_end_matches('\r')).collect();
    let mut entries = lines
        .split(|l| l.trim().is_empty())
        .filter(|block| !block.is_empty())
        .map(RawEntry::parse)
        .filter(|e| e.msgid.is_some())
        .peekable();

    let header = entries.next_if(RawEntry::is_header);
    let mut merged: IndexMap<(String, String), RawEntry> = IndexMap::new();
    let mut seen = 0usize;
    for entry in entries {
        seen += 1;
        match merged.entry(entry.key()) {
            Entry::Occupied(mut slot) => slot.get_mut().absorb(entry),
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    if merged.is_empty() {
        return None;
    }
    debug!(before = seen, after = merged.len(), "merged duplicate entries");

    let mut out = normalized_header(header.as_ref().map_or("", |h| h.msgstr.as_str()));
    for entry in merged.values() {
        entry.render(&mut out);
    }
    Some(out)
}

fn unparsable(detail: impl Into<String>) -> PipelineError {
    PipelineError::DedupFailed {
        status: "unparsable catalog".to_string(),
        stderr: detail.into(),
    }
}

impl Deduplicator for BuiltinDedup {
    #[instrument(level = "debug", skip(self, output))]
    fn dedup(&self, input: &Path, output: &Path) -> Result<DedupOutcome, PipelineError> {
        let text = match fs::read_to_string(input) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(unparsable("input is not UTF-8"));
            }
            Err(e) => return Err(PipelineError::Io(e)),
        };

        let Some(merged) = merge_duplicates(&text) else {
            return Ok(DedupOutcome::Empty);
        };

        // polib only parses from a path
        let mut scratch = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".po")
            .tempfile()?;
        scratch.write_all(merged.as_bytes())?;
        scratch.flush()?;

        let path = scratch.path();
        let catalog = std::panic::catch_unwind(|| po_file::parse(path))
            .map_err(|_| unparsable("catalog header rejected"))?
            .map_err(|e| unparsable(e.to_string()))?;

        if catalog.is_empty() {
            return Ok(DedupOutcome::Empty);
        }

        po_file::write(&catalog, output).map_err(|source| output_error(output, source))?;
        output_outcome(output)
    }
}

/// Failure to write the staged output is a destination failure.
fn output_error(output: &Path, source: std::io::Error) -> PipelineError {
    let path = output
        .parent()
        .map_or_else(|| output.to_path_buf(), PathBuf::from);
    PipelineError::Destination { path, source }
}

fn output_outcome(output: &Path) -> Result<DedupOutcome, PipelineError> {
    match fs::metadata(output) {
        Ok(m) if m.len() > 0 => Ok(DedupOutcome::Deduplicated),
        Ok(_) => Ok(DedupOutcome::Empty),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DedupOutcome::Empty),
        Err(e) => Err(PipelineError::Io(e)),
    }
}
