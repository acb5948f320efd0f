use std::path::PathBuf;

use clap::Parser;

use crate::time_expr::parse_time_expr;

const MAX_LINES_LIMIT: usize = 10_000;

#[derive(Parser, Debug)]
#[command(
    name = "cr",
    version,
    about = "Friendly LLM code review for git changes or a single file",
    after_help = "Examples:\n  cr                        # Review changed files\n  cr --since 2h             # Review what changed in the last two hours\n  cr app/Models/User.php    # Review a specific file"
)]
pub struct Cli {
    /// Specific file to review (if not provided, reviews git changes)
    pub file: Option<PathBuf>,

    /// Review changes since a time: 'today', '1h', '30m', '2d'
    #[arg(long, value_name = "TIME", value_parser = parse_since, conflicts_with = "since_commit")]
    pub since: Option<String>,

    /// Review changes since a specific commit
    #[arg(long, value_name = "COMMIT")]
    pub since_commit: Option<String>,

    /// Maximum lines for single file review before asking to continue
    #[arg(long, value_name = "N", value_parser = parse_max_lines)]
    pub max_lines: Option<usize>,

    /// Model to use for code review
    #[arg(long, value_name = "PROVIDER/MODEL", value_parser = parse_model)]
    pub model: Option<String>,

    /// Prompt file to use for this run
    #[arg(long, value_name = "FILE")]
    pub prompt_file: Option<PathBuf>,

    /// Enable debug mode with verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Automatically answer yes to prompts (useful for CI/automation)
    #[arg(short = 'y', long)]
    pub yes: bool,
}

fn parse_since(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("since time cannot be empty".to_string());
    }
    parse_time_expr(value).map_err(|e| e.to_string())?;
    Ok(value.to_string())
}

fn parse_max_lines(value: &str) -> Result<usize, String> {
    let n: i64 = value
        .trim()
        .parse()
        .map_err(|_| format!("max-lines must be an integer, got '{value}'"))?;
    if n <= 0 {
        return Err(format!("max-lines must be positive, got {n}"));
    }
    if n as u64 > MAX_LINES_LIMIT as u64 {
        return Err(format!("max-lines too large (max {MAX_LINES_LIMIT}), got {n}"));
    }
    Ok(n as usize)
}

fn parse_model(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("model name cannot be empty".to_string());
    }
    if !value.contains('/') {
        return Err(format!(
            "model should be in format 'provider/model', got '{value}'"
        ));
    }
    Ok(value.to_string())
}
