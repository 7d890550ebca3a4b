//! Terminal detection, tracing setup and console formatting.
//!
//! Formatting helpers are plain functions taking `color`; nothing here keeps state.

use chapter_downloader_core::catalog::format_chapter_number;
use chapter_downloader_core::{BatchReport, RetrievalOutcome};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(
    no_color_flag: bool,
    no_color_env: bool,
    dumb_terminal: bool,
) -> bool {
    no_color_flag || no_color_env || dumb_terminal
}

pub(crate) fn is_no_color_requested(no_color_flag: bool) -> bool {
    should_disable_color(no_color_flag, no_color_env_requested(), is_dumb_terminal())
}

pub(crate) fn init_tracing(default_level: &str, force_cli_level: bool, no_color: bool) {
    let filter = if force_cli_level {
        tracing_subscriber::EnvFilter::new(default_level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// One line per chapter: `[ok] 54 -> path` or `[failed] 55: reason`.
pub(crate) fn outcome_line(outcome: &RetrievalOutcome, color: bool) -> String {
    match outcome {
        RetrievalOutcome::Completed { chapter, path } => format!(
            "{} chapter {} -> {}",
            paint("[ok]", GREEN, color),
            format_chapter_number(*chapter),
            path.display()
        ),
        RetrievalOutcome::Failed { chapter, error } => format!(
            "{} chapter {}: {error}",
            paint("[failed]", RED, color),
            format_chapter_number(*chapter)
        ),
    }
}

/// Final `Succeeded: N, Failed: M` line.
pub(crate) fn summary_line(report: &BatchReport, color: bool) -> String {
    let text = format!(
        "Done. Succeeded: {}, Failed: {} (of {})",
        report.succeeded(),
        report.failed(),
        report.total()
    );
    paint(&text, BOLD, color)
}
