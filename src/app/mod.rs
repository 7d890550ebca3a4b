//! Binary-side plumbing: configuration assembly and console output.

pub(crate) mod config_runtime;
pub(crate) mod file_config;
pub(crate) mod terminal;
