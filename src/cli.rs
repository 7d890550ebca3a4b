//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Inclusive `LO-HI` pair parsed from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub lo: u32,
    pub hi: u32,
}

/// Parses `54-80` (or a single `54`) into a [`Span`].
pub fn parse_span(raw: &str) -> Result<Span, String> {
    let raw = raw.trim();
    let (lo, hi) = match raw.split_once('-') {
        Some((lo, hi)) => (lo.trim(), hi.trim()),
        None => (raw, raw),
    };
    let lo: u32 = lo
        .parse()
        .map_err(|_| format!("expected LO-HI with non-negative integers, got '{raw}'"))?;
    let hi: u32 = hi
        .parse()
        .map_err(|_| format!("expected LO-HI with non-negative integers, got '{raw}'"))?;
    if lo > hi {
        return Err(format!("range start {lo} exceeds end {hi}"));
    }
    Ok(Span { lo, hi })
}

fn parse_delay(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("expected seconds as a number, got '{raw}'"))?;
    if value.is_finite() && (0.0..=600.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("request delay must be between 0 and 600 seconds, got {value}"))
    }
}

/// Download a chapter range of a series and package each chapter as a CBZ archive.
///
/// Chapters are fetched from the catalog API, their pages downloaded from the
/// image host, and each chapter is written as
/// `{chapter}ch - {name} - vol{volume}.cbz` with embedded metadata.
#[derive(Parser, Debug, Clone)]
#[command(name = "chapter-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Series slug as it appears in catalog URLs
    pub slug: String,

    /// First chapter to download
    #[arg(long, conflicts_with = "chapters")]
    pub start: Option<u32>,

    /// Last chapter to download (defaults to --start)
    #[arg(long, requires = "start", conflicts_with = "chapters")]
    pub end: Option<u32>,

    /// Chapter range as START-END (e.g. 54-80)
    #[arg(long, value_parser = parse_span)]
    pub chapters: Option<Span>,

    /// Series title used for the output directory and metadata
    #[arg(long)]
    pub title: Option<String>,

    /// Use this volume for every chapter instead of resolving it
    #[arg(long)]
    pub volume: Option<u32>,

    /// Output directory for archives
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum chapters downloaded at once (1-64)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub chapter_concurrency: Option<u16>,

    /// Maximum images downloaded at once per chapter (1-64)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub image_concurrency: Option<u16>,

    /// Pause in seconds after each successful API response
    #[arg(long, value_parser = parse_delay)]
    pub request_delay: Option<f64>,

    /// Volumes probed when no other strategy finds a chapter (LO-HI)
    #[arg(long, value_parser = parse_span)]
    pub fallback_volumes: Option<Span>,

    /// Keep per-chapter staging directories
    #[arg(long)]
    pub keep_temp: bool,

    /// Place archives in per-volume sub-directories
    #[arg(long)]
    pub group_by_volume: bool,

    /// Catalog API base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Base URL for host-relative image paths
    #[arg(long)]
    pub image_host: Option<String>,

    /// Referer presented to the image host
    #[arg(long)]
    pub referer: Option<String>,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/chapter-downloader/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Requested chapter range, if one was given.
    #[must_use]
    pub fn chapter_range(&self) -> Option<(u32, u32)> {
        if let Some(span) = self.chapters {
            return Some((span.lo, span.hi));
        }
        let start = self.start?;
        Some((start, self.end.unwrap_or(start)))
    }

    /// Default log level implied by `-v`/`-q`.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Whether the level was chosen explicitly and should override `RUST_LOG`.
    #[must_use]
    pub fn log_level_forced(&self) -> bool {
        self.quiet || self.verbose > 0
    }
}
