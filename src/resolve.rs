//! Turns the user's flags into the one piece of content that gets reviewed.
//!
//! An explicit file is read as-is. Otherwise the change set comes from git:
//! a `--since` time resolves to a commit (or to uncommitted changes when no
//! commit is that old), `--since-commit` is used directly, and the default is
//! the uncommitted working tree. An empty change set walks a fixed fallback
//! chain that always ends at the last commit, so resolution terminates.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::changes::{ChangeScope, FileFilter, locate};
use crate::confirm::Confirm;
use crate::diff::assemble;
use crate::error::{Result, ReviewError};
use crate::git::{GitRunner, commit_before};
use crate::time_expr::parse_time_expr;
use crate::util::{count_lines, short_hash};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    ExplicitFile,
    Uncommitted,
    SinceCommit,
    /// Requested only; a resolved target reports the scope the time led to.
    SinceTime,
    LastCommit,
}

impl From<&ChangeScope> for SelectionMode {
    fn from(scope: &ChangeScope) -> Self {
        match scope {
            ChangeScope::Uncommitted => Self::Uncommitted,
            ChangeScope::SinceCommit(_) => Self::SinceCommit,
            ChangeScope::LastCommit => Self::LastCommit,
        }
    }
}

/// What the user asked to review.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub file: Option<PathBuf>,
    pub since: Option<String>,
    pub since_commit: Option<String>,
}

impl ResolveRequest {
    pub fn requested_mode(&self) -> SelectionMode {
        if self.file.is_some() {
            SelectionMode::ExplicitFile
        } else if self.since.is_some() {
            SelectionMode::SinceTime
        } else if self.since_commit.is_some() {
            SelectionMode::SinceCommit
        } else {
            SelectionMode::Uncommitted
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolveSettings {
    pub max_file_lines: usize,
    pub max_diff_lines: usize,
    pub diff_context_lines: u32,
    pub filter: FileFilter,
}

/// Resolved content plus how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewTarget {
    pub content: String,
    pub mode: SelectionMode,
    pub files: Vec<String>,
    pub commit: Option<String>,
}

/// Resolve `request` into review content.
///
/// `open_git` runs only when git is actually needed, so an explicit file works
/// outside a repository.
pub fn resolve<R, F>(
    request: &ResolveRequest,
    settings: &ResolveSettings,
    confirm: &dyn Confirm,
    open_git: F,
) -> Result<ReviewTarget>
where
    R: GitRunner,
    F: FnOnce() -> Result<R>,
{
    if let Some(path) = &request.file {
        return resolve_file(path, settings.max_file_lines, confirm);
    }
    let git = open_git()?;
    resolve_changes(&git, request, settings, confirm)
}

pub fn resolve_file(path: &Path, max_lines: usize, confirm: &dyn Confirm) -> Result<ReviewTarget> {
    if !path.exists() {
        return Err(ReviewError::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ReviewError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(ReviewError::EmptyFile(path.to_path_buf()));
    }

    let line_count = count_lines(&content);
    if line_count > max_lines
        && !confirm.confirm(&format!(
            "File has {line_count} lines (max: {max_lines}). Continue?"
        ))?
    {
        return Err(ReviewError::UserCancelled(
            "Review cancelled by user".to_string(),
        ));
    }

    Ok(ReviewTarget {
        content,
        mode: SelectionMode::ExplicitFile,
        files: vec![path.display().to_string()],
        commit: None,
    })
}

pub fn resolve_changes<R: GitRunner + ?Sized>(
    git: &R,
    request: &ResolveRequest,
    settings: &ResolveSettings,
    confirm: &dyn Confirm,
) -> Result<ReviewTarget> {
    let (initial, from_time) = initial_scope(git, request)?;

    let mut found = None;
    for scope in fallback_chain(&initial, from_time) {
        if scope != initial {
            info!("No changes found for {initial}, checking {scope}");
        }
        let files = locate(git, &scope, &settings.filter)?;
        if !files.is_empty() {
            found = Some((scope, files));
            break;
        }
    }
    let Some((scope, files)) = found else {
        return Err(ReviewError::NoChangedFiles);
    };
    info!(
        "Found {} changed file(s): {}",
        files.len(),
        files.as_slice().join(", ")
    );
    let files = files.into_vec();

    let diff = assemble(git, &files, &scope, settings.diff_context_lines)?;
    if !diff.is_empty() {
        let diff_lines = diff.line_count();
        debug!(scope = %diff.scope, lines = diff_lines, "diff assembled");
        if diff_lines > settings.max_diff_lines
            && !confirm.confirm(&format!(
                "Large diff detected ({diff_lines} lines). Continue with full diff review?"
            ))?
        {
            return Err(ReviewError::UserCancelled(
                "Consider reviewing files one at a time with: cr <filename>".to_string(),
            ));
        }
    }

    Ok(ReviewTarget {
        content: diff.wrapped(),
        mode: SelectionMode::from(&scope),
        commit: scope.commit().map(str::to_string),
        files,
    })
}

/// Starting scope, and whether it came from a `--since` time.
fn initial_scope<R: GitRunner + ?Sized>(
    git: &R,
    request: &ResolveRequest,
) -> Result<(ChangeScope, bool)> {
    if let Some(since) = &request.since {
        let at = parse_time_expr(since)?;
        return Ok(match commit_before(git, &at)? {
            Some(commit) => {
                info!("Using commit {} from time '{since}'", short_hash(&commit));
                (ChangeScope::SinceCommit(commit), true)
            }
            None => {
                info!("No commits found before '{since}', reviewing all changes");
                (ChangeScope::Uncommitted, false)
            }
        });
    }
    if let Some(commit) = &request.since_commit {
        return Ok((ChangeScope::SinceCommit(commit.clone()), false));
    }
    Ok((ChangeScope::Uncommitted, false))
}

/// Scopes to try in order. A commit found from a `--since` time may have
/// nothing committed after it while local edits exist, so that case checks
/// uncommitted changes before the last commit.
fn fallback_chain(initial: &ChangeScope, from_time: bool) -> Vec<ChangeScope> {
    match initial {
        ChangeScope::SinceCommit(_) if from_time => vec![
            initial.clone(),
            ChangeScope::Uncommitted,
            ChangeScope::LastCommit,
        ],
        ChangeScope::SinceCommit(_) | ChangeScope::Uncommitted => {
            vec![initial.clone(), ChangeScope::LastCommit]
        }
        ChangeScope::LastCommit => vec![ChangeScope::LastCommit],
    }
}
