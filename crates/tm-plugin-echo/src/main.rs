//! Entry point of the echo plugin binary.
//!
//! Stdout carries only the handshake line, so logs go to stderr, where the
//! host forwards them into its own log.

use std::io;

use anyhow::{Context, bail};
use tm_plugin_proto::handshake::is_plugin_env;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TM_LOG_FILTER").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    if !is_plugin_env() {
        bail!("this binary is a terramate plugin and must be launched by terramate");
    }
    let selection = tm_plugin_echo::Selection::parse(
        std::env::var(tm_plugin_echo::SERVICES_ENV).ok().as_deref(),
    )
    .with_context(|| format!("invalid {}", tm_plugin_echo::SERVICES_ENV))?;
    tm_plugin_echo::server(&selection)
        .serve()
        .context("serving plugin")
}
