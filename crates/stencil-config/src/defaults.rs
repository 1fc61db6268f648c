use crate::logging::LogFormat;

/// Environment variable listing plugin search directories.
pub const PLUGIN_DIRS_ENV: &str = "STENCIL_PLUGIN_DIRS";

/// Environment variable holding the plugin timeout in seconds.
pub const PLUGIN_TIMEOUT_ENV: &str = "STENCIL_PLUGIN_TIMEOUT";

/// Environment variable holding the log filter expression.
pub const LOG_FILTER_ENV: &str = "STENCIL_LOG_FILTER";

/// Environment variable holding the log format.
pub const LOG_FORMAT_ENV: &str = "STENCIL_LOG_FORMAT";

/// Separator between directories in [`PLUGIN_DIRS_ENV`].
pub const PLUGIN_DIRS_SEPARATOR: char = ':';

/// Default log filter expression used by the binary.
///
/// Plugin chatter is only interesting when debugging, so the default stays
/// quiet and keeps stderr free for template errors.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Returns [`DEFAULT_LOG_FILTER`].
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
