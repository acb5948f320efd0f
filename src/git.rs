use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::{Result, ReviewError};
use crate::time_expr::to_git_timestamp;

const GIT_NOT_FOUND: &str = "Command not found: git";

/// Something that can run a git subcommand and hand back its stdout.
///
/// Stdout has trailing whitespace trimmed. A non-zero exit or a missing binary
/// is a `ReviewError::VersionControl` carrying the command line and stderr.
pub trait GitRunner {
    fn run(&self, args: &[&str]) -> Result<String>;

    /// Directory the commands run in; relative paths from git resolve against it.
    fn workdir(&self) -> &Path;
}

/// Runs the `git` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemGit {
    workdir: PathBuf,
}

impl SystemGit {
    /// Confirm `start` is inside a work tree and anchor at its top level.
    pub fn discover(start: &Path) -> Result<Self> {
        let probe = Self {
            workdir: start.to_path_buf(),
        };
        let toplevel = match probe.run(&["rev-parse", "--show-toplevel"]) {
            Ok(out) => out,
            Err(ReviewError::VersionControl { detail, .. }) if detail != GIT_NOT_FOUND => {
                debug!(%detail, "git repository check failed");
                return Err(ReviewError::NotARepository);
            }
            Err(e) => return Err(e),
        };
        debug!(toplevel = %toplevel, "git repository check passed");
        Ok(Self {
            workdir: PathBuf::from(toplevel),
        })
    }
}

impl GitRunner for SystemGit {
    fn run(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        let output = match Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ReviewError::VersionControl {
                    command,
                    detail: GIT_NOT_FOUND.to_string(),
                });
            }
            Err(e) => {
                return Err(ReviewError::VersionControl {
                    command,
                    detail: e.to_string(),
                });
            }
        };

        if !output.status.success() {
            return Err(ReviewError::VersionControl {
                command,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// Newest commit on HEAD made at or before `at`, if any.
pub fn commit_before<R: GitRunner + ?Sized>(
    git: &R,
    at: &DateTime<Local>,
) -> Result<Option<String>> {
    let before = format!("--before={}", to_git_timestamp(at));
    debug!(%before, "looking up commit");
    let out = git.run(&["rev-list", "-n", "1", &before, "HEAD"])?;
    let hash = out.trim();
    if hash.is_empty() {
        debug!("no commit found before target time");
        Ok(None)
    } else {
        debug!(commit = hash, "found commit");
        Ok(Some(hash.to_string()))
    }
}


#[cfg(test)]
pub(crate) mod test_repo {
    use std::fs;
    use std::path::Path;
    use std::process::Command;

    use tempfile::TempDir;

    pub fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    pub fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
            .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
            .args(args)
            .current_dir(dir)
            .output()
            .expect("git runs");
        assert!(
            status.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&status.stderr)
        );
    }

    /// A fresh repository with one commit holding `app.py`.
    pub fn init_repo() -> Option<TempDir> {
        if !git_available() {
            eprintln!("Skipping test: git not available");
            return None;
        }
        let dir = TempDir::new().expect("tempdir");
        git(dir.path(), &["init", "-q"]);
        fs::write(dir.path().join("app.py"), "print('hello')\n").expect("write");
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "init"]);
        Some(dir)
    }
}
