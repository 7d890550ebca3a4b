//! Optional TOML configuration file.
//!
//! ```toml
//! output_dir = "downloads"
//! chapter_concurrency = 2
//! image_concurrency = 3
//! request_delay = 2.0
//! fallback_volumes = [1, 15]
//! cleanup_temp = true
//! group_by_volume = false
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const APP_DIR: &str = "chapter-downloader";
const CONFIG_FILE: &str = "config.toml";

/// File-level defaults; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub title: Option<String>,
    pub volume: Option<u32>,
    pub chapter_concurrency: Option<usize>,
    pub image_concurrency: Option<usize>,
    /// Seconds.
    pub request_delay: Option<f64>,
    pub fallback_volumes: Option<[u32; 2]>,
    pub cleanup_temp: Option<bool>,
    pub group_by_volume: Option<bool>,
    pub api_base: Option<String>,
    pub image_host: Option<String>,
    pub referer: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Range-checks values the CLI would also reject.
    pub fn validate(&self) -> Result<()> {
        if let Some(delay) = self.request_delay
            && !(delay.is_finite() && (0.0..=600.0).contains(&delay))
        {
            bail!("Invalid config value for `request_delay`: {delay}. Expected range: 0..=600");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/chapter-downloader/config.toml`
/// 2. `$HOME/.config/chapter-downloader/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the explicit config file, or the default one if it exists.
///
/// An explicit path that does not exist is an error; a missing default file is not.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Parses and validates TOML config text.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
