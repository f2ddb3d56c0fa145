//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tm_plugin_proto::transport::ListenerError;
use tm_plugin_proto::{RpcError, RpcStatus};

/// Errors arising from plugin operations.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// A manifest could not be read or decoded.
    #[error("invalid plugin manifest '{}': {message}", .path.display())]
    Manifest {
        /// Manifest file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {source}")]
    Spawn {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin exited before completing the handshake.
    #[error("plugin '{name}' exited before the handshake")]
    Exited {
        /// Plugin name.
        name: String,
    },

    /// The plugin's handshake line was rejected.
    #[error("plugin '{name}' sent an invalid handshake: {message}")]
    Handshake {
        /// Plugin name.
        name: String,
        /// Reason the line was rejected.
        message: String,
    },

    /// The plugin did not respond within a deadline.
    #[error("plugin '{name}' timed out after {timeout_secs}s during {stage}")]
    Timeout {
        /// Plugin name.
        name: String,
        /// What the host was waiting for.
        stage: &'static str,
        /// Deadline in seconds.
        timeout_secs: u64,
    },

    /// The plugin dispensed a different service bundle.
    #[error("plugin '{name}' dispensed bundle '{actual}', expected '{expected}'")]
    BundleMismatch {
        /// Plugin name.
        name: String,
        /// Bundle the host asked for.
        expected: String,
        /// Bundle the plugin returned.
        actual: String,
    },

    /// A call to the plugin failed.
    #[error("plugin '{name}': {source}")]
    Rpc {
        /// Plugin name.
        name: String,
        /// Underlying call failure.
        #[source]
        source: RpcError,
    },

    /// The plugin reported error diagnostics.
    #[error("plugin '{name}' reported errors: {message}")]
    Diagnostics {
        /// Plugin name.
        name: String,
        /// Aggregated diagnostic text.
        message: String,
    },

    /// The plugin does not contribute the requested command.
    #[error("plugin '{name}' has no command '{command}'")]
    UnknownCommand {
        /// Plugin name.
        name: String,
        /// Requested command.
        command: String,
    },

    /// A command or generate stream ended without an exit code.
    #[error("plugin '{name}' ended '{method}' without an exit code")]
    MissingExitCode {
        /// Plugin name.
        name: String,
        /// Streaming method.
        method: &'static str,
    },

    /// The host service refused a call.
    #[error("host service rejected '{method}': {source}")]
    HostRejected {
        /// Host method that was called.
        method: String,
        /// Status returned by the host service.
        #[source]
        source: RpcStatus,
    },

    /// A plugin asked for a file write the host refused.
    #[error("refused to write plugin file '{path}': {source}")]
    FileRejected {
        /// Path the plugin asked for.
        path: String,
        /// Why the write was refused.
        #[source]
        source: RpcStatus,
    },

    /// The host service could not start listening.
    #[error("host service failed to start: {source}")]
    HostListener {
        /// Underlying listener failure.
        #[source]
        source: Arc<ListenerError>,
    },

    /// The host-service address handed to a plugin is unusable.
    #[error("invalid host service address '{value}': {message}")]
    HostAddress {
        /// Value of the address variable.
        value: String,
        /// Why it was rejected.
        message: String,
    },

    /// A local filesystem operation failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl PluginError {
    /// Wraps a call failure, turning deadline expiry into
    /// [`PluginError::Timeout`].
    #[must_use]
    pub fn from_rpc(name: &str, source: RpcError, timeout_secs: u64) -> Self {
        match source {
            RpcError::DeadlineExceeded { .. } => Self::Timeout {
                name: name.to_owned(),
                stage: "call",
                timeout_secs,
            },
            other => Self::Rpc {
                name: name.to_owned(),
                source: other,
            },
        }
    }

    /// True when a call failed because the plugin lacks the service.
    #[must_use]
    pub const fn is_unimplemented(&self) -> bool {
        match self {
            Self::Rpc { source, .. } => source.is_unimplemented(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests;
