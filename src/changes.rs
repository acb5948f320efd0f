use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::git::GitRunner;
use crate::util::short_hash;

/// The git-facing half of a selection mode: which changes a diff is taken over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Working tree and index against HEAD.
    Uncommitted,
    /// Everything committed after the given commit, up to HEAD.
    SinceCommit(String),
    /// The most recent commit alone.
    LastCommit,
}

impl ChangeScope {
    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::SinceCommit(commit) => Some(commit),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncommitted => write!(f, "uncommitted changes"),
            Self::SinceCommit(commit) => write!(f, "changes since {}", short_hash(commit)),
            Self::LastCommit => write!(f, "last commit"),
        }
    }
}

/// Changed paths in discovery order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFileSet {
    files: Vec<String>,
}

impl ChangedFileSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.files
    }

    pub fn into_vec(self) -> Vec<String> {
        self.files
    }
}

/// Decides which reported paths are worth reviewing.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
}

impl FileFilter {
    /// `extensions` may be given with or without the leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn is_supported(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|s| s == ext))
    }

    /// Keep supported paths that exist under `root`, in order, first occurrence wins.
    pub fn retain<'a, I>(&self, root: &Path, candidates: I) -> ChangedFileSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for name in candidates {
            if !self.is_supported(name) || !root.join(name).exists() {
                continue;
            }
            if seen.insert(name.to_string()) {
                debug!(file = name, "added supported file");
                files.push(name.to_string());
            }
        }
        debug!(count = files.len(), "extracted supported files");
        ChangedFileSet { files }
    }
}

/// Enumerate reviewable files for `scope`.
///
/// Listings are NUL-separated (`-z`) so git never quotes or escapes paths.
pub fn locate<R: GitRunner + ?Sized>(
    git: &R,
    scope: &ChangeScope,
    filter: &FileFilter,
) -> Result<ChangedFileSet> {
    let files = match scope {
        ChangeScope::Uncommitted => {
            debug!("listing working tree status");
            let out = git.run(&["status", "--porcelain", "-z"])?;
            filter.retain(git.workdir(), parse_porcelain(&out))
        }
        ChangeScope::SinceCommit(commit) => {
            debug!(commit = commit.as_str(), "listing files changed since commit");
            let out = git.run(&["diff", "--name-only", "-z", commit.as_str(), "HEAD"])?;
            filter.retain(git.workdir(), nul_fields(&out))
        }
        ChangeScope::LastCommit => {
            debug!("listing files from last commit");
            let out = git.run(&[
                "diff-tree",
                "--no-commit-id",
                "--name-only",
                "-z",
                "-r",
                "HEAD",
            ])?;
            let files = filter.retain(git.workdir(), nul_fields(&out));
            info!("Found {} files in last commit", files.len());
            files
        }
    };
    Ok(files)
}

fn nul_fields(out: &str) -> impl Iterator<Item = &str> {
    out.split('\0').filter(|f| !f.is_empty())
}

/// Paths from `git status --porcelain -z`, skipping anything marked deleted.
///
/// Entries read `XY path`; a rename or copy is followed by a separate field
/// holding its source path, which is skipped.
fn parse_porcelain(out: &str) -> Vec<&str> {
    let mut paths = Vec::new();
    let mut fields = nul_fields(out);
    while let Some(entry) = fields.next() {
        let (Some(status), Some(path)) = (entry.get(..2), entry.get(3..)) else {
            continue;
        };
        if status.contains(['R', 'C']) {
            fields.next();
        }
        if status.contains('D') || path.is_empty() {
            continue;
        }
        paths.push(path);
    }
    paths
}
