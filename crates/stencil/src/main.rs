//! CLI entrypoint for the Stencil template renderer.
//!
//! The binary delegates to [`stencil::run`], which parses arguments, loads
//! configuration, installs telemetry, and dispatches the subcommand.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    // Plugin stderr is logged from helper threads, so stderr stays unlocked.
    let mut stderr = io::stderr();
    stencil::run(std::env::args_os(), &mut stdout, &mut stderr)
}
