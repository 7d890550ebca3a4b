//! Builds the run configuration from CLI arguments, file config and defaults.
//!
//! Precedence: CLI value > file value > library default.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use chapter_downloader_core::RetrievalConfig;

use crate::app::file_config::FileConfig;
use crate::cli::Args;

/// Merges `args` over `file_config` over defaults and validates the result.
pub(crate) fn build_config(args: &Args, file_config: Option<&FileConfig>) -> Result<RetrievalConfig> {
    let Some((start, end)) = args.chapter_range() else {
        bail!("No chapter range given. Use --start/--end or --chapters START-END");
    };
    let file = file_config.cloned().unwrap_or_default();
    let mut config = RetrievalConfig::new(args.slug.trim(), start, end);

    config.title_override = args.title.clone().or(file.title);
    config.forced_volume = args.volume.or(file.volume);
    if let Some(output_dir) = args.output_dir.clone().or(file.output_dir) {
        config.output_dir = output_dir;
    }
    if let Some(value) = args.chapter_concurrency.map(usize::from).or(file.chapter_concurrency) {
        config.chapter_concurrency = value;
    }
    if let Some(value) = args.image_concurrency.map(usize::from).or(file.image_concurrency) {
        config.image_concurrency = value;
    }
    if let Some(seconds) = args.request_delay.or(file.request_delay) {
        config.request_delay = Duration::try_from_secs_f64(seconds)
            .with_context(|| format!("Invalid request delay: {seconds}"))?;
    }
    if let Some(span) = args.fallback_volumes {
        config.fallback_volumes = (span.lo, span.hi);
    } else if let Some([lo, hi]) = file.fallback_volumes {
        config.fallback_volumes = (lo, hi);
    }

    // Flags can only switch behaviour on; an absent flag defers to the file.
    config.cleanup_temp = !args.keep_temp && file.cleanup_temp.unwrap_or(true);
    config.group_by_volume = args.group_by_volume || file.group_by_volume.unwrap_or(false);

    if let Some(api_base) = args.api_base.clone().or(file.api_base) {
        config.api_base = api_base;
    }
    if let Some(image_host) = args.image_host.clone().or(file.image_host) {
        config.image_host = image_host;
    }
    if let Some(referer) = args.referer.clone().or(file.referer) {
        config.referer = referer;
    }
    if let Some(secs) = file.connect_timeout_secs {
        config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.read_timeout_secs {
        config.read_timeout = Duration::from_secs(secs);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
