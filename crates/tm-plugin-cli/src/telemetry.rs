//! Log output for `tm-plugin`.
//!
//! Events only ever go to stderr: stdout belongs to plugin output and to
//! the tab-separated reports the subcommands print.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tm_config::{Config, LogFormat};
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::fmt::{self, MakeWriter, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Errors raised while installing the log subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `--log-filter` / `TM_LOG_FILTER` did not parse.
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        /// Directives as configured.
        filter: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// Another subscriber already owns the process.
    #[error("failed to install the log subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Installs the process-wide subscriber writing to stderr.
///
/// Returns the format in effect. Only the first call installs anything;
/// later calls report the format chosen then.
///
/// # Examples
///
/// ```rust
/// use tm_config::Config;
/// use tm_plugin_cli::telemetry;
///
/// # fn main() -> Result<(), telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// assert_eq!(telemetry::initialise(&config)?, first);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<LogFormat, TelemetryError> {
    initialise_with(config, io::stderr, io::stderr().is_terminal())
}

/// Like [`initialise`] with a caller-chosen writer.
pub fn initialise_with<W>(
    config: &Config,
    writer: W,
    ansi: bool,
) -> Result<LogFormat, TelemetryError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    INSTALLED
        .get_or_try_init(|| {
            let filter = cli_filter(config.log_filter())?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .with_timer(UtcTime::rfc_3339());
            let registry = tracing_subscriber::registry().with(filter);
            match config.log_format() {
                LogFormat::Json => registry.with(layer.json().flatten_event(true)).try_init()?,
                LogFormat::Compact => registry.with(layer.compact()).try_init()?,
            }
            Ok(config.log_format())
        })
        .copied()
}

/// Parses filter directives; a blank filter silences logging.
pub(crate) fn cli_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    let effective = match directives.trim() {
        "" => "off",
        trimmed => trimmed,
    };
    EnvFilter::try_new(effective).map_err(|source| TelemetryError::Filter {
        filter: effective.to_owned(),
        source,
    })
}
