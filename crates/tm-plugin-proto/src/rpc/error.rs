//! Errors raised on the calling side of a connection.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::status::{Code, RpcStatus};

/// Failure of an RPC call.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The peer answered with an error status.
    #[error(transparent)]
    Status(#[from] RpcStatus),

    /// Reading or writing the connection failed.
    #[error("connection I/O failed during '{method}': {source}")]
    Io {
        /// Method in flight.
        method: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The peer did not answer before the read timeout.
    #[error("deadline exceeded waiting for '{method}'")]
    DeadlineExceeded {
        /// Method in flight.
        method: String,
    },

    /// The peer closed the connection mid-call.
    #[error("connection closed while waiting for '{method}'")]
    Closed {
        /// Method in flight.
        method: String,
    },

    /// The request parameters could not be serialised.
    #[error("failed to encode '{method}' request: {source}")]
    Encode {
        /// Method being called.
        method: String,
        /// Serialisation failure.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// A frame or payload did not have the expected shape.
    #[error("malformed reply to '{method}': {message}")]
    Decode {
        /// Method in flight.
        method: String,
        /// Description of the mismatch.
        message: String,
    },

    /// The peer broke the framing rules.
    #[error("protocol violation during '{method}': {message}")]
    Protocol {
        /// Method in flight.
        method: String,
        /// Description of the violation.
        message: String,
    },
}

impl RpcError {
    /// Maps an I/O failure, treating read timeouts as deadline expiry.
    pub(crate) fn from_io(method: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::DeadlineExceeded {
                method: method.to_owned(),
            },
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Closed {
                method: method.to_owned(),
            },
            _ => Self::Io {
                method: method.to_owned(),
                source: Arc::new(source),
            },
        }
    }

    pub(crate) fn protocol(method: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            method: method.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn decode(method: &str, error: &serde_json::Error) -> Self {
        Self::Decode {
            method: method.to_owned(),
            message: error.to_string(),
        }
    }

    /// Status returned by the peer, if this is a remote failure.
    #[must_use]
    pub const fn status(&self) -> Option<&RpcStatus> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }

    /// Status code, mapping local failures onto the closest code.
    #[must_use]
    pub const fn code(&self) -> Code {
        match self {
            Self::Status(status) => status.code(),
            Self::DeadlineExceeded { .. } => Code::DeadlineExceeded,
            Self::Closed { .. } | Self::Io { .. } => Code::Unavailable,
            Self::Encode { .. } | Self::Decode { .. } | Self::Protocol { .. } => Code::Internal,
        }
    }

    /// True when the peer does not offer the called service or method.
    #[must_use]
    pub const fn is_unimplemented(&self) -> bool {
        matches!(self.code(), Code::Unimplemented)
    }
}
