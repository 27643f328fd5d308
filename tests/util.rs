//! Shared test utilities for integration tests
//!
//! Provides a source-tree fixture and a tiny shell converter that honors
//! the converter exit-code contract, so the binary can be driven end to
//! end without any real extraction tooling installed.

#![allow(dead_code)]

use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;

/// Converter stand-in. Every `"label": "..."` line becomes one entry;
/// no labels exits 1 (empty), a `BROKEN` marker exits 3, `CRASH` kills
/// the converter and `SLOW` hangs it. Each call appends the document path
/// to `$CALL_LOG` when set.
pub const LABEL_CONVERTER: &str = r#"#!/bin/sh
doc="$1"
root="$2"
out="$3"
[ -n "$CALL_LOG" ] && echo "$doc" >> "$CALL_LOG"
if grep -q BROKEN "$doc"; then
    echo "cannot parse $doc" >&2
    exit 3
fi
grep -q CRASH "$doc" && kill -9 $$
grep -q SLOW "$doc" && exec sleep 30
labels=$(sed -n 's/.*"label": *"\([^"]*\)".*/\1/p' "$doc")
[ -z "$labels" ] && exit 1
rel="${doc#"$root"/}"
{
    printf 'msgid ""\nmsgstr ""\n"Content-Type: text/plain; charset=UTF-8\\n"\n\n'
    echo "$labels" | while IFS= read -r s; do
        printf '#: %s\nmsgid "%s"\nmsgstr ""\n\n' "$rel" "$s"
    done
} > "$out"
"#;

/// Project layout: source tree, destination, private TMPDIR, converter.
pub struct Fixture
{
    pub dir: assert_fs::TempDir,
}

impl Fixture
{
    pub fn new() -> Self
    {
        // Initialize the temporary project root
        let dir = assert_fs::TempDir::new().expect("tempdir");

        dir.child("convert.sh")
            .write_str(LABEL_CONVERTER)
            .expect("write converter");
        dir.child("tmp")
            .create_dir_all()
            .expect("create tmp");

        Self { dir }
    }

    /// Write a JSON document under `cfg/`
    pub fn doc(
        &self,
        rel: &str,
        body: &str,
    ) -> &Self
    {
        self.dir
            .child("cfg")
            .child(rel)
            .write_str(body)
            .expect("write doc");
        self
    }

    pub fn out(&self) -> std::path::PathBuf
    {
        self.dir
            .path()
            .join("out")
    }

    pub fn call_log(&self) -> std::path::PathBuf
    {
        self.dir
            .path()
            .join("calls.log")
    }

    /// `jsonpot --quiet run cfg out` with the shell converter and builtin dedup
    pub fn run_cmd(&self) -> Command
    {
        self.run_cmd_with(&["--quiet"])
    }

    /// Same as `run_cmd` with explicit global flags
    pub fn run_cmd_with(
        &self,
        global: &[&str],
    ) -> Command
    {
        let mut cmd = Command::cargo_bin("jsonpot").expect("jsonpot binary");
        cmd.current_dir(self.dir.path())
            .env("TMPDIR", self.dir.path().join("tmp"))
            .env("CALL_LOG", self.call_log())
            .env_remove("JSONPOT_LOG")
            .args(global)
            .args(["run", "cfg", "out"])
            .args(["--converter", "sh", "--converter-arg"])
            .arg(self.dir.path().join("convert.sh"))
            .args(["--dedup", "builtin"]);
        cmd
    }

    /// Names of every entry left in a directory
    pub fn listing(dir: &std::path::Path) -> Vec<String>
    {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|e| {
                e.expect("entry")
                    .file_name()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        names.sort();
        names
    }
}
