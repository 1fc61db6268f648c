//! Command-line runtime for the Stencil template renderer.
//!
//! The module owns argument parsing, configuration validation, telemetry
//! bootstrapping, and dispatch of the `render`, `call`, and `resolve`
//! subcommands. IO streams and the process spawner are injectable so the
//! runtime can be exercised from tests.

use std::error::Error as _;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use minijinja::{Environment, context};
use serde_json::Value;
use stencil_config::{Config, ConfigError};
use stencil_plugins::{
    InvokeOptions, OsProcessSpawner, PluginError, PluginFunction, PluginInvoker, ProcessSpawner,
    envelope, locator,
};
use thiserror::Error;
use tracing::debug;

mod cli;
pub mod telemetry;


use cli::{Cli, CliCommand};
use telemetry::TelemetryError;

/// Tracing target for CLI dispatch.
const CLI_TARGET: &str = "stencil::cli";

/// Errors surfaced by the CLI runtime.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// A plugin call failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// Template parsing or evaluation failed.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    /// The template file could not be read.
    #[error("failed to read template '{path}': {source}")]
    ReadTemplate {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The `--data` value was not valid JSON.
    #[error("--data is not valid JSON: {0}")]
    InvalidData(#[source] serde_json::Error),
    /// Writing output failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

/// Runs the CLI with real plugin processes.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_spawner(args, stdout, stderr, OsProcessSpawner)
}

/// Runs the CLI, spawning plugins through `spawner`.
pub fn run_with_spawner<I, W, E, S>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    spawner: S,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    S: ProcessSpawner + 'static,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_parse_error(&error, stdout, stderr),
    };

    match execute(cli, stdout, spawner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            drop(writeln!(stderr, "stencil: {}", describe(&error)));
            ExitCode::FAILURE
        }
    }
}

fn report_parse_error<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    use clap::error::ErrorKind;

    let rendered = error.render().to_string();
    if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        drop(write!(stdout, "{rendered}"));
        ExitCode::SUCCESS
    } else {
        drop(write!(stderr, "{rendered}"));
        ExitCode::FAILURE
    }
}

fn execute<W: Write, S: ProcessSpawner + 'static>(
    cli: Cli,
    stdout: &mut W,
    spawner: S,
) -> Result<(), CliError> {
    let Cli { config, command } = cli;
    config.validate()?;
    telemetry::install(&config)?;
    if let Ok(resolved) = serde_json::to_string(&config) {
        debug!(target: CLI_TARGET, config = %resolved, "resolved configuration");
    }
    debug!(target: CLI_TARGET, ?command, "dispatching command");

    let function = plugin_function(&config, spawner);
    match command {
        CliCommand::Render { template, data } => {
            let rendered = render(&function, &template, data.as_deref())?;
            stdout.write_all(rendered.as_bytes()).map_err(CliError::Output)
        }
        CliCommand::Call {
            plugin,
            function: name,
            data,
            raw,
        } => {
            let argument = parse_data(data.as_deref())?;
            if raw {
                let output = call_raw(&function, &plugin, &name, &argument)?;
                stdout.write_all(&output).map_err(CliError::Output)
            } else {
                let result = function.call(&plugin, &name, &argument)?;
                let json = serde_json::to_string(&result).map_err(PluginError::Encode)?;
                writeln!(stdout, "{json}").map_err(CliError::Output)
            }
        }
        CliCommand::Resolve { name } => {
            let path = locator::resolve(function.search_dirs(), &name)?;
            writeln!(stdout, "{}", path.display()).map_err(CliError::Output)
        }
    }
}

fn plugin_function<S: ProcessSpawner>(config: &Config, spawner: S) -> PluginFunction<S> {
    let options = config
        .plugin_timeout()
        .map_or_else(InvokeOptions::new, |timeout| {
            InvokeOptions::new().with_timeout(timeout)
        });
    let invoker = Arc::new(PluginInvoker::new(spawner).with_options(options));
    PluginFunction::from_shared(invoker, config.search_dirs())
}

fn parse_data(data: Option<&str>) -> Result<Value, CliError> {
    data.map_or(Ok(Value::Null), |text| {
        serde_json::from_str(text).map_err(CliError::InvalidData)
    })
}

/// Renders the template at `path` with `plugin()` registered.
fn render<S: ProcessSpawner + 'static>(
    function: &PluginFunction<S>,
    path: &Path,
    data: Option<&str>,
) -> Result<String, CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::ReadTemplate {
        path: path.to_path_buf(),
        source,
    })?;
    let data = parse_data(data)?;

    let mut env = Environment::new();
    function.clone().register(&mut env);
    Ok(env.render_str(&source, context! { data => data })?)
}

fn call_raw<S: ProcessSpawner>(
    function: &PluginFunction<S>,
    plugin: &str,
    name: &str,
    argument: &Value,
) -> Result<Vec<u8>, PluginError> {
    let request = envelope::encode(argument)?;
    let program = function.locate(plugin)?;
    function.invoker().call_raw(&program, name, &request)
}

/// Joins an error with any sources whose text it does not already include.
fn describe(error: &CliError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
