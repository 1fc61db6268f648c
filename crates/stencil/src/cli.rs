//! CLI argument definitions for the Stencil renderer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stencil_config::Config;

/// Command-line interface for the Stencil renderer.
#[derive(Parser, Debug)]
#[command(
    name = "stencil",
    version,
    about = "Render templates that call out-of-process plugins",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// Shared configuration flags.
    #[command(flatten)]
    pub(crate) config: Config,
    /// The action to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Structured subcommands for the Stencil CLI.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Renders a template file with `plugin(name, function, value)` available.
    Render {
        /// Path to the template file.
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,
        /// JSON value exposed to the template as `data`.
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
    },
    /// Calls one plugin function and prints the result.
    Call {
        /// Plugin name or path.
        #[arg(value_name = "PLUGIN")]
        plugin: String,
        /// Function to run inside the plugin.
        #[arg(value_name = "FUNCTION")]
        function: String,
        /// JSON value sent as the request's `data`.
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
        /// Prints the plugin's output bytes without decoding them.
        #[arg(long)]
        raw: bool,
    },
    /// Prints the path a plugin name resolves to.
    Resolve {
        /// Bare plugin name.
        #[arg(value_name = "NAME")]
        name: String,
    },
}
