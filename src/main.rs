//! CLI entry point for the chapter downloader.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use chapter_downloader_core::BatchScheduler;
use clap::Parser;
use tracing::{debug, info};

mod app;
mod cli;

use app::{config_runtime, file_config, terminal};
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::is_no_color_requested(args.no_color);
    terminal::init_tracing(args.log_level(), args.log_level_forced(), no_color);
    debug!(?args, "CLI arguments parsed");

    let file_config = file_config::load_file_config(args.config.as_deref())?;
    let config = config_runtime::build_config(&args, file_config.as_ref())?;
    info!(
        slug = %config.slug,
        start = config.start,
        end = config.end,
        output_dir = %config.output_dir.display(),
        "Chapter downloader starting"
    );

    let scheduler = BatchScheduler::from_config(&config).context("Failed to start retrieval")?;
    let report = scheduler.retrieve_range(&config).await;

    // Per-chapter lines and the summary go to stdout; a fully failed batch still exits 0.
    let color = !no_color && io::stdout().is_terminal();
    if !args.quiet {
        for outcome in report.outcomes() {
            println!("{}", terminal::outcome_line(outcome, color));
        }
    }
    println!("{}", terminal::summary_line(&report, color));

    Ok(())
}
