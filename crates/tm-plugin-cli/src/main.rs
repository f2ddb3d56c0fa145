//! CLI entrypoint for the terramate plugin host.
//!
//! The binary delegates to [`tm_plugin_cli::run`], which parses arguments,
//! installs telemetry, and drives the requested plugin operation.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    tm_plugin_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
