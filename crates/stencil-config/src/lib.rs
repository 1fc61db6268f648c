//! Shared configuration for the Stencil toolchain.
//!
//! Settings are layered the way `clap` resolves them: explicit command-line
//! flags win over `STENCIL_*` environment variables, which win over the
//! built-in defaults. The [`Config`] struct is flattened into the CLI parser
//! so every binary accepts the same flags.

use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Args;
use serde::Serialize;
use thiserror::Error;

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, LOG_FILTER_ENV, LOG_FORMAT_ENV, PLUGIN_DIRS_ENV, PLUGIN_DIRS_SEPARATOR,
    PLUGIN_TIMEOUT_ENV, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by Stencil binaries.
///
/// Serialises to JSON so binaries can log the settings they resolved.
#[derive(Debug, Clone, Args, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Directory searched for plugins; earlier directories win. Repeatable.
    #[arg(
        long = "plugin-dir",
        value_name = "DIR",
        env = PLUGIN_DIRS_ENV,
        value_delimiter = PLUGIN_DIRS_SEPARATOR,
        global = true
    )]
    pub plugin_dirs: Vec<Utf8PathBuf>,

    /// Kill plugins that run longer than this many seconds.
    #[arg(
        long = "plugin-timeout",
        value_name = "SECS",
        env = PLUGIN_TIMEOUT_ENV,
        global = true
    )]
    pub plugin_timeout_secs: Option<u64>,

    /// Tracing filter directive, for example `stencil_plugins=debug`.
    #[arg(
        long,
        value_name = "FILTER",
        env = LOG_FILTER_ENV,
        default_value = DEFAULT_LOG_FILTER,
        global = true
    )]
    pub log_filter: String,

    /// Log output format.
    #[arg(
        long,
        value_name = "FORMAT",
        env = LOG_FORMAT_ENV,
        default_value_t = default_log_format(),
        global = true
    )]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            plugin_timeout_secs: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Plugin search directories in lookup order.
    #[must_use]
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.plugin_dirs
            .iter()
            .map(|dir| dir.as_std_path().to_path_buf())
            .collect()
    }

    /// Plugin timeout, when one is configured.
    #[must_use]
    pub fn plugin_timeout(&self) -> Option<Duration> {
        self.plugin_timeout_secs.map(Duration::from_secs)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Rejects settings that cannot work at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTimeout`] for a zero-second timeout,
    /// [`ConfigError::EmptyLogFilter`] for a blank filter, and
    /// [`ConfigError::MissingPluginDir`] when a search directory is not a
    /// directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plugin_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        if let Some(dir) = self.plugin_dirs.iter().find(|dir| !dir.is_dir()) {
            return Err(ConfigError::MissingPluginDir { path: dir.clone() });
        }
        Ok(())
    }
}

/// Errors raised while validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The plugin timeout was zero seconds.
    #[error("plugin timeout must be at least one second")]
    ZeroTimeout,
    /// The log filter was blank.
    #[error("log filter must not be empty")]
    EmptyLogFilter,
    /// A configured plugin directory does not exist or is not a directory.
    #[error("plugin directory '{path}' does not exist or is not a directory")]
    MissingPluginDir {
        /// The offending directory.
        path: Utf8PathBuf,
    },
}
