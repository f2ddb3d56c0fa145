//! Deadlines applied to plugin processes and calls.

use std::time::Duration;

use crate::defaults::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_GENERATE_TIMEOUT_SECS, DEFAULT_POST_INIT_TIMEOUT_SECS,
    DEFAULT_START_TIMEOUT_SECS,
};

/// Time limits for talking to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Process start and handshake.
    pub start: Duration,
    /// A single unary call or stream read.
    pub call: Duration,
    /// A `Lifecycle/PostInit` call.
    pub post_init: Duration,
    /// A `Generate/Generate` stream read.
    pub generate: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            start: Duration::from_secs(DEFAULT_START_TIMEOUT_SECS),
            call: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            post_init: Duration::from_secs(DEFAULT_POST_INIT_TIMEOUT_SECS),
            generate: Duration::from_secs(DEFAULT_GENERATE_TIMEOUT_SECS),
        }
    }
}

impl Deadlines {
    /// Uses `timeout` for every deadline.
    #[must_use]
    pub const fn uniform(timeout: Duration) -> Self {
        Self {
            start: timeout,
            call: timeout,
            post_init: timeout,
            generate: timeout,
        }
    }
}
