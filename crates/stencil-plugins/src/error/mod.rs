//! Domain errors raised while resolving, invoking, and decoding plugins.
//!
//! All errors use a `thiserror`-derived enum with structured context so
//! callers can inspect the failure programmatically. I/O errors are wrapped
//! in `Arc` to keep the enum small and `Send + Sync`.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from a plugin call.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No search directory contained a plugin with the requested name.
    #[error("plugin '{name}' not found in any of {searched} search directories")]
    NotFound {
        /// Name that was looked up.
        name: String,
        /// Number of directories that were searched.
        searched: usize,
    },

    /// The plugin executable could not be started.
    #[error("plugin '{name}' failed to start: {source}")]
    Spawn {
        /// Plugin identifier handed to the spawner.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The request could not be written to the plugin's standard input.
    #[error("failed to write request to plugin '{name}': {source}")]
    Write {
        /// Plugin identifier.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Reading output from, or waiting on, the plugin process failed.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin identifier.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin did not exit within the configured timeout.
    #[error("plugin '{name}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Plugin identifier.
        name: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The plugin exited with a status other than success.
    #[error("plugin '{name}' exited with non-zero status {status}")]
    NonZeroExit {
        /// Plugin identifier.
        name: String,
        /// Exit code, or `-1` when the process was terminated by a signal.
        status: i32,
    },

    /// The argument could not be serialised into an envelope.
    #[error("failed to encode plugin request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The plugin output was not a well-formed JSON object.
    #[error("failed to decode response from plugin '{name}': {source}")]
    Decode {
        /// Plugin identifier, or `<envelope>` when decoding outside a call.
        name: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The decoded response lacked the `data` field.
    #[error("response from plugin '{name}' has no 'data' field")]
    MissingData {
        /// Plugin identifier.
        name: String,
    },
}

impl PluginError {
    pub(crate) fn spawn(name: &str, source: std::io::Error) -> Self {
        Self::Spawn {
            name: name.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn write(name: &str, source: std::io::Error) -> Self {
        Self::Write {
            name: name.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn io(name: &str, source: std::io::Error) -> Self {
        Self::Io {
            name: name.to_owned(),
            source: Arc::new(source),
        }
    }

    /// Returns the plugin name the error refers to, when there is one.
    #[must_use]
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::NotFound { name, .. }
            | Self::Spawn { name, .. }
            | Self::Write { name, .. }
            | Self::Io { name, .. }
            | Self::Timeout { name, .. }
            | Self::NonZeroExit { name, .. }
            | Self::Decode { name, .. }
            | Self::MissingData { name } => Some(name.as_str()),
            Self::Encode(_) => None,
        }
    }
}

#[cfg(test)]
mod tests;
