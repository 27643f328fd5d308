//! Filepath: src/infra/walk.rs
//! Source document discovery.
//! - Recursive, follows symlinks by default (loops are reported, not fatal)
//! - Selects files whose *name* matches the include globs (default `*.json`)
//! - Classifies files under an excluded path as `Excluded` instead of
//!   yielding them as documents
//! - Lazy: entries are produced while the tree is walked
//!
//! Backed by ripgrep's `ignore` crate with its standard filters disabled
//! (no .gitignore, hidden files included) and `globset`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::core::error::PipelineError;

/// Decides whether a document is kept out of extraction.
/// Receives the path relative to the traversal root.
pub trait ExclusionPolicy: Send + Sync
{
    fn excludes(
        &self,
        relative: &Path,
    ) -> bool;
}

impl<F> ExclusionPolicy for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn excludes(
        &self,
        relative: &Path,
    ) -> bool
    {
        self(relative)
    }
}

/// Excludes any path with a component equal to one of the segments.
/// `tests` matches `a/tests/b.json` but not `a/contests/b.json`.
#[derive(Debug, Clone, Default)]
pub struct SegmentExclusion
{
    segments: Vec<OsString>,
}

impl SegmentExclusion
{
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl ExclusionPolicy for SegmentExclusion
{
    fn excludes(
        &self,
        relative: &Path,
    ) -> bool
    {
        relative
            .components()
            .any(|c| {
                self.segments
                    .iter()
                    .any(|s| s.as_os_str() == c.as_os_str())
            })
    }
}

/// One classified walk entry
#[derive(Debug)]
pub enum WalkItem
{
    /// Matches the include globs and is not excluded
    Document(PathBuf),
    /// Matches the include globs but sits under an excluded path
    Excluded(PathBuf),
    /// Entry below the root could not be read (permission, symlink loop)
    Error(ignore::Error),
}

/// Walker producing source documents under a root.
pub struct FileWalker
{
    /// Compiled file-name patterns selecting documents
    include: GlobSet,

    /// Policy consulted for every matching file
    exclusion: Arc<dyn ExclusionPolicy>,

    /// Follow symbolic links; default true
    follow_symlinks: bool,
}

impl FileWalker
{
    /// Build a walker selecting file names that match any of `include_patterns`
    /// (e.g., "*.json", "*.def.json"). Nothing is excluded until
    /// `with_exclusion` is called.
    pub fn new(include_patterns: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in include_patterns
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            include: builder.build()?,
            exclusion: Arc::new(|_: &Path| false),
            follow_symlinks: true,
        })
    }

    /// Replace the exclusion policy.
    pub fn with_exclusion(
        mut self,
        policy: impl ExclusionPolicy + 'static,
    ) -> Self
    {
        self.exclusion = Arc::new(policy);
        self
    }

    /// (Optional) Follow or skip symbolic links (default true).
    pub fn with_follow_symlinks(
        mut self,
        follow: bool,
    ) -> Self
    {
        self.follow_symlinks = follow;
        self
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // Plain recursive traversal: no ignore files, hidden entries included
        b.standard_filters(false);

        b.follow_links(self.follow_symlinks);

        // Stable order within a directory keeps reports readable
        b.sort_by_file_name(|a, b| a.cmp(b));

        b
    }

    /// Lazily walk `root`. Fails up front only when the root itself cannot
    /// be read; errors deeper in the tree come back as `WalkItem::Error`.
    pub fn walk<'a>(
        &'a self,
        root: &'a Path,
    ) -> Result<impl Iterator<Item = WalkItem> + 'a, PipelineError>
    {
        std::fs::read_dir(root)
            .map_err(|source| PipelineError::RootUnreadable { path: root.to_path_buf(), source })?;

        let walker = self
            .build_walk(root)
            .build();

        Ok(walker.filter_map(move |res| {
            let entry = match res
            {
                Ok(entry) => entry,
                Err(err) => return Some(WalkItem::Error(err)),
            };

            // Keep only regular files (symlink targets when following)
            if !entry
                .file_type()
                .is_some_and(|ft| ft.is_file())
            {
                return None;
            }

            if !self
                .include
                .is_match(entry.file_name())
            {
                return None;
            }

            let path = entry.into_path();
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path);

            if self
                .exclusion
                .excludes(rel)
            {
                Some(WalkItem::Excluded(path))
            }
            else
            {
                Some(WalkItem::Document(path))
            }
        }))
    }

    /// Collect the documents under `root`, dropping excluded files and
    /// traversal errors.
    #[cfg(test)]
    fn documents(
        &self,
        root: &Path,
    ) -> Result<Vec<PathBuf>, PipelineError>
    {
        Ok(self
            .walk(root)?
            .filter_map(|item| match item
            {
                WalkItem::Document(p) => Some(p),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Create a file with parent dirs as needed
    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    ) -> Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            std::fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn relative(
        root: &Path,
        files: Vec<PathBuf>,
    ) -> Vec<PathBuf>
    {
        files
            .into_iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_path_buf()
            })
            .collect()
    }

    fn json_walker() -> Result<FileWalker>
    {
        Ok(FileWalker::new(&["*.json".to_string()])?.with_exclusion(SegmentExclusion::new(["tests"])))
    }

    #[test]
    fn test_selects_json_recursively() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "a.json", "{}")?;
        write_file(root, "plugins/b/plugin.json", "{}")?;
        write_file(root, "README.md", "# readme")?;
        write_file(root, "c.json.bak", "{}")?;

        let mut files = relative(root, json_walker()?.documents(root)?);
        files.sort();

        assert_eq!(files, vec![PathBuf::from("a.json"), PathBuf::from("plugins/b/plugin.json")]);
        Ok(())
    }

    #[test]
    fn test_fixture_segment_is_excluded() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "cfg/a.json", "{}")?;
        write_file(root, "cfg/tests/b.json", "{}")?;
        write_file(root, "tests/deep/c.json", "{}")?;
        write_file(root, "contests/d.json", "{}")?;

        let walker = json_walker()?;
        let mut docs = Vec::new();
        let mut excluded = Vec::new();
        for item in walker.walk(root)?
        {
            match item
            {
                WalkItem::Document(p) => docs.push(p),
                WalkItem::Excluded(p) => excluded.push(p),
                WalkItem::Error(e) => panic!("unexpected walk error: {e}"),
            }
        }

        let mut docs = relative(root, docs);
        docs.sort();
        let mut excluded = relative(root, excluded);
        excluded.sort();

        assert_eq!(docs, vec![PathBuf::from("cfg/a.json"), PathBuf::from("contests/d.json")]);
        assert_eq!(
            excluded,
            vec![PathBuf::from("cfg/tests/b.json"), PathBuf::from("tests/deep/c.json")]
        );
        Ok(())
    }

    #[test]
    fn test_exclusion_is_relative_to_root() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir
            .path()
            .join("tests")
            .join("cfg");

        write_file(&root, "a.json", "{}")?;

        let files = relative(&root, json_walker()?.documents(&root)?);
        assert_eq!(files, vec![PathBuf::from("a.json")]);
        Ok(())
    }

    #[test]
    fn test_closure_policy() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "keep.json", "{}")?;
        write_file(root, "skip.json", "{}")?;

        let walker = FileWalker::new(&["*.json".to_string()])?
            .with_exclusion(|rel: &Path| rel.ends_with("skip.json"));
        let files = relative(root, walker.documents(root)?);

        assert_eq!(files, vec![PathBuf::from("keep.json")]);
        Ok(())
    }

    #[test]
    fn test_hidden_entries_are_walked() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, ".hidden/a.json", "{}")?;
        write_file(root, ".gitignore", "*.json")?;

        let files = relative(root, json_walker()?.documents(root)?);
        assert_eq!(files, vec![PathBuf::from(".hidden/a.json")]);
        Ok(())
    }

    #[test]
    fn test_unreadable_root_is_fatal() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let missing = temp_dir
            .path()
            .join("missing");

        let walker = json_walker()?;
        let err = walker
            .walk(&missing)
            .err()
            .expect("missing root must fail");
        assert!(err.is_fatal());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_symlinks() -> Result<()>
    {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new()?;
        let outside = TempDir::new()?;
        let root = temp_dir.path();

        write_file(outside.path(), "shared/x.json", "{}")?;
        symlink(outside.path().join("shared"), root.join("linked"))?;

        let files = relative(root, json_walker()?.documents(root)?);
        assert_eq!(files, vec![PathBuf::from("linked/x.json")]);

        let files = json_walker()?
            .with_follow_symlinks(false)
            .documents(root)?;
        assert!(files.is_empty());
        Ok(())
    }
}
