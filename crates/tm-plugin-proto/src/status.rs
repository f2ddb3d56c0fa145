//! Status codes carried by failed RPC calls.
//!
//! The code set mirrors the gRPC canonical codes that the host and plugins
//! actually use, so callers can tell a sandbox violation
//! ([`Code::PermissionDenied`]) from a missing capability
//! ([`Code::Unimplemented`]) without parsing messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical status code of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    /// The caller abandoned the operation.
    Cancelled,
    /// An error with no better classification.
    Unknown,
    /// The request was malformed or missing a required field.
    InvalidArgument,
    /// The operation did not finish before its deadline.
    DeadlineExceeded,
    /// The requested file, node, or stack does not exist.
    NotFound,
    /// The entity the caller tried to create already exists.
    AlreadyExists,
    /// The caller may not perform the operation.
    PermissionDenied,
    /// The system is not in a state that allows the operation.
    FailedPrecondition,
    /// The service or method is not offered by the peer.
    Unimplemented,
    /// An invariant inside the peer was broken.
    Internal,
    /// The peer cannot serve the request right now.
    Unavailable,
}

impl Code {
    /// Returns the canonical snake case spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
            Self::InvalidArgument => "invalid_argument",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::PermissionDenied => "permission_denied",
            Self::FailedPrecondition => "failed_precondition",
            Self::Unimplemented => "unimplemented",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure returned by a service method and carried across the wire.
///
/// # Example
///
/// ```
/// use tm_plugin_proto::{Code, RpcStatus};
///
/// let status = RpcStatus::permission_denied("path outside root directory");
/// assert_eq!(status.code(), Code::PermissionDenied);
/// assert_eq!(status.to_string(), "permission_denied: path outside root directory");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RpcStatus {
    code: Code,
    #[serde(default)]
    message: String,
}

impl RpcStatus {
    /// Creates a status with an explicit code.
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for [`Code::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// Shorthand for [`Code::PermissionDenied`].
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(Code::PermissionDenied, message)
    }

    /// Shorthand for [`Code::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// Shorthand for [`Code::Unavailable`].
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// Shorthand for [`Code::Unimplemented`].
    #[must_use]
    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    /// Shorthand for [`Code::Internal`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    /// Returns the status code.
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Returns the human-readable message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}
