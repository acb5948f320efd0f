use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, ReviewError};

const HOME_PROMPT_FILE: &str = ".code-review-prompt.md";
const BUNDLED_PROMPT_FILE: &str = "system_prompt.md";

/// Where the review system prompt may live, most specific first.
pub fn default_prompt_locations() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(home) = dirs::home_dir() {
        out.push(home.join(HOME_PROMPT_FILE));
    }
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        out.push(dir.join(BUNDLED_PROMPT_FILE));
    }
    out.push(Path::new(env!("CARGO_MANIFEST_DIR")).join(BUNDLED_PROMPT_FILE));
    out
}

/// Read the system prompt from `explicit`, or the first readable of `candidates`.
///
/// An explicit file that is missing or unreadable is an error; it does not fall
/// through to the defaults.
pub fn load_system_prompt(
    explicit: Option<&Path>,
    candidates: &[PathBuf],
) -> Result<(PathBuf, String)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ReviewError::PromptNotFound(format!(
                "prompt file {} does not exist",
                path.display()
            )));
        }
        info!("Using custom prompt file: {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ReviewError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok((path.to_path_buf(), text));
    }

    for path in candidates {
        if !path.is_file() {
            continue;
        }
        match fs::read_to_string(path) {
            Ok(text) => {
                info!("Using default prompt file: {}", path.display());
                return Ok((path.clone(), text));
            }
            Err(e) => debug!("Failed to read {}: {e}", path.display()),
        }
    }

    let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    Err(ReviewError::PromptNotFound(format!(
        "looked in [{}]",
        tried.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn explicit_file_wins() {
        let dir = TempDir::new().expect("tempdir");
        let explicit = dir.path().join("mine.md");
        let fallback = dir.path().join("fallback.md");
        fs::write(&explicit, "explicit prompt").expect("write");
        fs::write(&fallback, "fallback prompt").expect("write");

        let (path, text) = load_system_prompt(Some(&explicit), &[fallback]).expect("prompt");
        assert_eq!(path, explicit);
        assert_eq!(text, "explicit prompt");
    }

    #[test]
    fn missing_explicit_file_does_not_fall_through() {
        let dir = TempDir::new().expect("tempdir");
        let fallback = dir.path().join("fallback.md");
        fs::write(&fallback, "fallback prompt").expect("write");

        let err = load_system_prompt(Some(&dir.path().join("gone.md")), &[fallback]).unwrap_err();
        assert!(matches!(err, ReviewError::PromptNotFound(_)));
    }

    #[test]
    fn first_existing_candidate_is_used() {
        let dir = TempDir::new().expect("tempdir");
        let absent = dir.path().join("absent.md");
        let second = dir.path().join("second.md");
        let third = dir.path().join("third.md");
        fs::write(&second, "second").expect("write");
        fs::write(&third, "third").expect("write");

        let (path, text) =
            load_system_prompt(None, &[absent, second.clone(), third]).expect("prompt");
        assert_eq!(path, second);
        assert_eq!(text, "second");
    }

    #[test]
    fn no_candidates_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_system_prompt(None, &[dir.path().join("nothing.md")]).unwrap_err();
        match err {
            ReviewError::PromptNotFound(msg) => assert!(msg.contains("nothing.md")),
            other => panic!("expected PromptNotFound, got {other:?}"),
        }
    }

    #[test]
    fn bundled_prompt_ships_with_the_crate() {
        let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join(BUNDLED_PROMPT_FILE);
        let (_, text) = load_system_prompt(None, &[bundled]).expect("bundled prompt");
        assert!(!text.trim().is_empty());
    }
}
