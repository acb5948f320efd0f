use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Not in a git repository")]
    NotARepository,

    #[error("Invalid time format: '{0}'. Use formats like '1h', '30m', '2d', or 'today'")]
    InvalidTimeFormat(String),

    #[error("Command failed: {command}\n{detail}")]
    VersionControl { command: String, detail: String },

    #[error("File {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("File {} is empty", .0.display())]
    EmptyFile(PathBuf),

    #[error("Error reading {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't find any changed files")]
    NoChangedFiles,

    #[error("{0}")]
    UserCancelled(String),

    #[error("No prompt file found: {0}")]
    PromptNotFound(String),

    #[error("Review request has an empty {0}")]
    EmptyRequest(&'static str),

    #[error(
        "Content too large ({estimated} estimated tokens, limit {limit}). Consider reviewing smaller chunks or individual files."
    )]
    ContentTooLarge { estimated: usize, limit: usize },

    #[error(
        "LLM response was truncated due to the {max_tokens} token limit. Try reviewing fewer or smaller files, or increase max_tokens in config."
    )]
    TruncatedResponse { max_tokens: u32 },

    #[error("LLM returned empty content: {0}")]
    EmptyResponse(&'static str),

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(&'static str),

    #[error("Error getting review from LLM: {0}")]
    LlmDispatch(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ReviewError {
    /// Outcomes that mean "nothing to do" rather than a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NoChangedFiles | Self::UserCancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
