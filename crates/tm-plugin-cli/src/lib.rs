//! Command-line runtime for the terramate plugin host.
//!
//! [`run`] parses arguments, installs telemetry, and dispatches to one of
//! the plugin operations: listing and inspecting installed plugins, running
//! plugin commands, generate overrides, post-init hooks, and parsing
//! configuration with plugin-declared blocks. Output streams are injected so
//! tests can capture them.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
pub mod telemetry;

use cli::Cli;

/// Runs the CLI using the provided arguments and IO handles.
///
/// Errors are written to `stderr` with their full cause chain and end the
/// process with status 1. Plugin commands and generate overrides exit with
/// the plugin's own status.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return usage(&error, stdout, stderr),
    };
    if let Err(error) = telemetry::initialise(&cli.config) {
        let _written = writeln!(stderr, "warning: {error}");
    }
    match commands::execute(cli, stdout, stderr) {
        Ok(code) => code,
        Err(error) => {
            let _written = writeln!(stderr, "error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Prints clap's rendering of a parse failure, or of `--help`/`--version`.
fn usage<W: Write, E: Write>(error: &clap::Error, stdout: &mut W, stderr: &mut E) -> ExitCode {
    let rendered = error.render().to_string();
    let _written = if error.use_stderr() {
        write!(stderr, "{rendered}")
    } else {
        write!(stdout, "{rendered}")
    };
    exit_code(error.exit_code())
}

/// Maps a plugin status onto a process status; out-of-range values fail.
pub(crate) fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
