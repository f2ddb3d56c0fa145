//! Runtime settings shared by the plugin host binaries.
//!
//! [`Config`] is a `clap` argument group: each setting is read from its
//! command-line flag, then its environment variable, then the defaults in
//! [`defaults`]. Binaries flatten it into their own parser.

pub mod defaults;
mod deadlines;
mod logging;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

pub use self::deadlines::Deadlines;
pub use self::logging::{LogFormat, LogFormatParseError};

/// Environment variable that disables plugin discovery.
pub const DISABLE_PLUGINS_ENV: &str = "TM_DISABLE_GRPC_PLUGINS";

/// Settings for plugin discovery, logging, and call deadlines.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// User terramate directory; plugins live in its `plugins` folder.
    #[arg(long, env = "TM_USER_DIR", global = true, value_name = "DIR")]
    user_dir: Option<PathBuf>,

    /// Disables plugin discovery unless empty, `0`, or `false`.
    #[arg(long = "disable-plugins", env = DISABLE_PLUGINS_ENV, global = true, value_name = "FLAG")]
    disable_plugins: Option<String>,

    /// Tracing filter directives.
    #[arg(long, env = "TM_LOG_FILTER", global = true, default_value = defaults::DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log output format (`compact` or `json`).
    #[arg(
        long,
        env = "TM_LOG_FORMAT",
        global = true,
        default_value_t = defaults::default_log_format()
    )]
    log_format: LogFormat,

    /// Seconds allowed for a plugin to start and complete its handshake.
    #[arg(long, env = "TM_START_TIMEOUT", global = true, value_name = "SECS",
          default_value_t = defaults::DEFAULT_START_TIMEOUT_SECS)]
    start_timeout: u64,

    /// Seconds allowed for a single plugin call.
    #[arg(long, env = "TM_CALL_TIMEOUT", global = true, value_name = "SECS",
          default_value_t = defaults::DEFAULT_CALL_TIMEOUT_SECS)]
    call_timeout: u64,

    /// Seconds allowed for a post-init hook.
    #[arg(long, env = "TM_POST_INIT_TIMEOUT", global = true, value_name = "SECS",
          default_value_t = defaults::DEFAULT_POST_INIT_TIMEOUT_SECS)]
    post_init_timeout: u64,

    /// Seconds allowed for a generate override.
    #[arg(long, env = "TM_GENERATE_TIMEOUT", global = true, value_name = "SECS",
          default_value_t = defaults::DEFAULT_GENERATE_TIMEOUT_SECS)]
    generate_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_dir: None,
            disable_plugins: None,
            log_filter: defaults::DEFAULT_LOG_FILTER.to_owned(),
            log_format: defaults::default_log_format(),
            start_timeout: defaults::DEFAULT_START_TIMEOUT_SECS,
            call_timeout: defaults::DEFAULT_CALL_TIMEOUT_SECS,
            post_init_timeout: defaults::DEFAULT_POST_INIT_TIMEOUT_SECS,
            generate_timeout: defaults::DEFAULT_GENERATE_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Overrides the user directory.
    #[must_use]
    pub fn with_user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    /// Overrides the disable switch with a raw variable value.
    #[must_use]
    pub fn with_disable_plugins(mut self, value: impl Into<String>) -> Self {
        self.disable_plugins = Some(value.into());
        self
    }

    /// User terramate directory, falling back to the default location.
    #[must_use]
    pub fn user_dir(&self) -> PathBuf {
        self.user_dir
            .clone()
            .unwrap_or_else(defaults::default_user_dir)
    }

    /// True when plugin discovery is switched off.
    #[must_use]
    pub fn plugins_disabled(&self) -> bool {
        plugins_disabled_from(self.disable_plugins.as_deref())
    }

    /// Tracing filter directives.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Call deadlines.
    #[must_use]
    pub const fn deadlines(&self) -> Deadlines {
        Deadlines {
            start: Duration::from_secs(self.start_timeout),
            call: Duration::from_secs(self.call_timeout),
            post_init: Duration::from_secs(self.post_init_timeout),
            generate: Duration::from_secs(self.generate_timeout),
        }
    }
}

/// Interprets the value of [`DISABLE_PLUGINS_ENV`].
///
/// Any non-empty value other than exactly `0` or `false` disables
/// discovery.
///
/// # Example
///
/// ```
/// use tm_config::plugins_disabled_from;
///
/// assert!(plugins_disabled_from(Some("1")));
/// assert!(!plugins_disabled_from(Some("false")));
/// assert!(plugins_disabled_from(Some("FALSE")));
/// assert!(!plugins_disabled_from(None));
/// ```
#[must_use]
pub fn plugins_disabled_from(value: Option<&str>) -> bool {
    !matches!(value, None | Some("" | "0" | "false"))
}
