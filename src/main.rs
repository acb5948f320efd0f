mod changes;
mod cli;
mod commands;
mod config;
mod confirm;
mod diff;
mod dispatch;
mod display;
mod error;
mod git;
mod llm;
mod prompt;
mod resolve;
mod time_expr;
mod util;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::commands::run_review;
use crate::config::load_config;
use crate::error::ReviewError;

fn init_tracing(debug: bool) {
    let fallback = if debug { "warn,cr=debug" } else { "warn,cr=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = load_config().and_then(|cfg| run_review(&cfg, &cli));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ReviewError>() {
            Some(ReviewError::NoChangedFiles) => {
                println!("No changed files to review");
                ExitCode::SUCCESS
            }
            Some(benign) if benign.is_benign() => {
                println!("{benign}");
                ExitCode::SUCCESS
            }
            _ => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
