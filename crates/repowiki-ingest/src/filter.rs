//! Path filtering for files and folders of a repository tree.
//!
//! Patterns are regular expressions searched anywhere in the lowercased
//! repository-relative path, so they should be written in lowercase.
//! Files go through an allow list and then a deny list; folders only
//! through a deny list matched against their full path.

use crate::error::IngestResult;
use regex::RegexSet;
use repowiki_config::FilterConfig;
use repowiki_core::DirectoryNode;

/// A compiled list of path patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: RegexSet,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> IngestResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            set: RegexSet::new(patterns)?,
        })
    }

    /// An empty set matches nothing.
    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    /// Whether any pattern is found in the lowercased path.
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(&path.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Files matching at least one `allow` pattern and no `deny` pattern, in input order.
pub fn select_files<'a>(paths: &'a [String], allow: &PatternSet, deny: &PatternSet) -> Vec<&'a str> {
    paths
        .iter()
        .filter(|path| allow.matches(path) && !deny.matches(path))
        .map(String::as_str)
        .collect()
}

/// Subdirectories whose path matches no `deny` pattern, in input order.
pub fn select_folders<'a>(subdirs: &'a [DirectoryNode], deny: &PatternSet) -> Vec<&'a DirectoryNode> {
    subdirs.iter().filter(|dir| !deny.matches(&dir.path)).collect()
}

/// The three pattern lists used during a walk.
#[derive(Debug, Clone)]
pub struct PathFilter {
    allow: PatternSet,
    deny_files: PatternSet,
    deny_folders: PatternSet,
}

impl PathFilter {
    pub fn new(allow: PatternSet, deny_files: PatternSet, deny_folders: PatternSet) -> Self {
        Self {
            allow,
            deny_files,
            deny_folders,
        }
    }

    /// Compile the patterns of the `[filter]` section.
    pub fn from_config(config: &FilterConfig) -> IngestResult<Self> {
        Ok(Self::new(
            PatternSet::new(&config.allow_patterns)?,
            PatternSet::new(&config.deny_file_patterns)?,
            PatternSet::new(&config.deny_folder_patterns)?,
        ))
    }

    pub fn select_files<'a>(&self, paths: &'a [String]) -> Vec<&'a str> {
        select_files(paths, &self.allow, &self.deny_files)
    }

    pub fn select_folders<'a>(&self, subdirs: &'a [DirectoryNode]) -> Vec<&'a DirectoryNode> {
        select_folders(subdirs, &self.deny_folders)
    }
}
