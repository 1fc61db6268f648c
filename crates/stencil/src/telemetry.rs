//! Diagnostic logging for the CLI.
//!
//! Stdout carries the command's result (rendered text, call output, resolved
//! paths), so every log line goes to stderr regardless of format or level.
//! Raising the filter to `trace` never corrupts piped output.

use std::io::{self, IsTerminal};

use stencil_config::{Config, LogFormat};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::prelude::*;

/// Tracing target for telemetry set-up.
const TELEMETRY_TARGET: &str = "stencil::telemetry";

/// Errors raised while installing diagnostic logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter is not a valid directive list.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Filter as configured.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
}

/// Installs a stderr subscriber shaped by `config`.
///
/// A subscriber that is already global (from an earlier run in the same
/// process, or from a host embedding the CLI) is left in place.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the log filter does not parse.
pub fn install(config: &Config) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            message: error.to_string(),
        })?;

    let (json, compact) = match config.log_format() {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(io::stderr),
            ),
            None,
        ),
        LogFormat::Compact => (
            None,
            Some(
                fmt::layer()
                    .compact()
                    .with_timer(UtcTime::rfc_3339())
                    .with_ansi(io::stderr().is_terminal())
                    .with_writer(io::stderr),
            ),
        ),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(compact)
        .try_init()
        .is_ok();
    debug!(
        target: TELEMETRY_TARGET,
        installed,
        format = %config.log_format(),
        "diagnostic logging ready"
    );
    Ok(())
}
