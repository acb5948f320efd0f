use tracing::{debug, info};

use crate::changes::ChangeScope;
use crate::error::Result;
use crate::git::GitRunner;
use crate::util::count_lines;

/// Raw `git diff` output and the scope it was taken over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffContent {
    pub text: String,
    pub scope: ChangeScope,
}

impl DiffContent {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Non-blank lines, the unit the diff ceiling is measured in.
    pub fn line_count(&self) -> usize {
        count_lines(&self.text)
    }

    /// Fenced for the model; empty stays empty.
    pub fn wrapped(&self) -> String {
        if self.text.is_empty() {
            String::new()
        } else {
            format!("```diff\n{}\n```", self.text)
        }
    }
}

/// Diff `files` over `scope` with `context_lines` of surrounding context.
///
/// A failing `git diff` is an error, never an empty diff.
pub fn assemble<R: GitRunner + ?Sized>(
    git: &R,
    files: &[String],
    scope: &ChangeScope,
    context_lines: u32,
) -> Result<DiffContent> {
    if files.is_empty() {
        debug!("no files provided for diff");
        return Ok(DiffContent {
            text: String::new(),
            scope: scope.clone(),
        });
    }

    let context = format!("-U{context_lines}");
    let mut args: Vec<&str> = vec!["diff", context.as_str()];
    match scope {
        ChangeScope::Uncommitted => {
            debug!("getting uncommitted changes diff");
            args.push("HEAD");
        }
        ChangeScope::SinceCommit(commit) => {
            debug!(commit = commit.as_str(), "getting diff since commit");
            args.extend([commit.as_str(), "HEAD"]);
        }
        ChangeScope::LastCommit => {
            debug!("getting last commit diff");
            args.extend(["HEAD^", "HEAD"]);
        }
    }
    args.push("--");
    args.extend(files.iter().map(String::as_str));

    let text = git.run(&args)?;
    info!(
        words = text.split_whitespace().count(),
        "Retrieved diff content"
    );
    Ok(DiffContent {
        text,
        scope: scope.clone(),
    })
}
