use std::env;
use std::io::{self, IsTerminal};

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::config::Config;
use crate::confirm;
use crate::dispatch::{DispatchOptions, ReviewRequest, dispatch};
use crate::display::display_review;
use crate::git::SystemGit;
use crate::llm::HttpBackend;
use crate::prompt::{default_prompt_locations, load_system_prompt};
use crate::resolve::{ResolveRequest, ResolveSettings, SelectionMode, resolve};
use crate::util::{WorkingStatus, short_hash};

pub fn run_review(cfg: &Config, args: &Cli) -> Result<()> {
    let request = ResolveRequest {
        file: args.file.clone(),
        since: args.since.clone(),
        since_commit: args.since_commit.clone(),
    };
    let settings = ResolveSettings {
        max_file_lines: args.max_lines.unwrap_or(cfg.max_single_file_lines),
        max_diff_lines: cfg.max_total_diff_lines,
        diff_context_lines: cfg.diff_context_lines,
        filter: cfg.file_filter(),
    };
    debug!(mode = ?request.requested_mode(), "resolving review target");

    let confirm = confirm::for_flag(args.yes);
    let target = resolve(&request, &settings, confirm.as_ref(), || {
        SystemGit::discover(&env::current_dir()?)
    })?;

    match (target.mode, &request.file) {
        (SelectionMode::ExplicitFile, Some(path)) => {
            println!("🔍 Reviewing {}...", path.display());
        }
        (mode, _) => {
            let origin = match (mode, target.commit.as_deref()) {
                (SelectionMode::LastCommit, _) => "in the last commit".to_string(),
                (_, Some(commit)) => format!("since commit {}", short_hash(commit)),
                _ => "in the working tree".to_string(),
            };
            println!(
                "🔍 Reviewing {} changed file(s) {origin}...",
                target.files.len()
            );
            for file in &target.files {
                info!("  {file}");
            }
        }
    }

    if target.content.trim().is_empty() {
        println!("No changes to review.");
        return Ok(());
    }

    let (prompt_path, system_prompt) =
        load_system_prompt(args.prompt_file.as_deref(), &default_prompt_locations())?;
    debug!(path = %prompt_path.display(), "system prompt loaded");

    let model = args
        .model
        .clone()
        .unwrap_or_else(|| cfg.default_model.clone());
    let review_request = ReviewRequest {
        content: target.content,
        system_prompt,
        model,
        max_tokens: cfg.max_tokens,
        temperature: cfg.temperature,
    };
    let options = DispatchOptions {
        chars_per_token: cfg.chars_per_token,
        max_estimated_tokens: cfg.max_estimated_tokens,
        debug: args.debug,
    };

    let backend = HttpBackend::new(cfg)?;
    let status = io::stdout()
        .is_terminal()
        .then(|| WorkingStatus::start(format!("reviewing with {}", review_request.model)));
    let outcome = dispatch(&backend, &review_request, &options);
    if let Some(status) = status {
        status.finish();
    }
    let review = outcome?;
    info!(model = %review.model, cost = review.cost, "review complete");

    display_review(&review.text, &cfg.glow_style);
    Ok(())
}
