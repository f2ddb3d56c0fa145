//! Default values for [`crate::Config`].

use std::env;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Seconds allowed for start-up and handshake.
pub const DEFAULT_START_TIMEOUT_SECS: u64 = 10;

/// Seconds allowed for a single call.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Seconds allowed for a post-init hook.
pub const DEFAULT_POST_INIT_TIMEOUT_SECS: u64 = 60;

/// Seconds allowed for a generate override.
pub const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 900;

/// Name of the user terramate directory under the home directory.
pub const USER_DIR_NAME: &str = ".terramate.d";

/// Default log format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// `~/.terramate.d`, or a directory under the system temp dir when the home
/// directory is unknown.
#[must_use]
pub fn default_user_dir() -> PathBuf {
    dirs::home_dir().map_or_else(
        || env::temp_dir().join(USER_DIR_NAME),
        |home| home.join(USER_DIR_NAME),
    )
}
