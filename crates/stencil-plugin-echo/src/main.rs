//! Binary entrypoint for the reference echo plugin.

use std::io::{self, Write};
use std::process::ExitCode;

use stencil_plugin_echo::run;

fn main() -> ExitCode {
    let Some(function) = std::env::args().nth(1) else {
        writeln!(io::stderr().lock(), "usage: stencil-plugin-echo <FUNCTION>").ok();
        return ExitCode::FAILURE;
    };

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    if let Err(error) = run(&function, &mut stdin, &mut stdout) {
        writeln!(io::stderr().lock(), "{error}").ok();
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
