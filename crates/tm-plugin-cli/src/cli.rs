//! Command-line definitions for `tm-plugin`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tm_config::Config;

/// Inspects and drives terramate RPC plugins.
#[derive(Parser, Debug)]
#[command(name = "tm-plugin", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: Config,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Plugin operations.
#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Lists installed plugins.
    List,
    /// Starts a plugin and prints what it offers as JSON.
    Info {
        /// Plugin name.
        plugin: String,
    },
    /// Runs a plugin command.
    Exec(ExecArgs),
    /// Lets a plugin override code generation.
    Generate {
        /// Project root directory.
        root: PathBuf,
        /// Directory generation runs from; defaults to the root.
        #[arg(long, value_name = "DIR")]
        working_dir: Option<PathBuf>,
    },
    /// Runs every post-init hook against a project.
    PostInit {
        /// Project root directory.
        root: PathBuf,
    },
    /// Parses a configuration file with plugin-declared blocks.
    Parse {
        /// Project root directory.
        root: PathBuf,
        /// File to parse, relative to the root unless absolute.
        file: PathBuf,
    },
}

/// Arguments of `tm-plugin exec`.
#[derive(Args, Debug)]
pub(crate) struct ExecArgs {
    /// Plugin name.
    pub(crate) plugin: String,
    /// Command to run.
    pub(crate) command: String,
    /// Named argument passed to the command.
    #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) args: Vec<(String, String)>,
    /// Flag passed to the command.
    #[arg(long = "flag", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) flags: Vec<(String, String)>,
    /// Project root; starts the host service for the plugin when given.
    #[arg(long, value_name = "DIR")]
    pub(crate) root: Option<PathBuf>,
}

/// Splits `key=value`; the key must not be empty.
pub(crate) fn parse_key_value(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{input}'")),
    }
}
