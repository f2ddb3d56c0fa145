//! Magic-cookie handshake shared by the host and every plugin binary.
//!
//! The host launches a plugin with [`HandshakeConfig::magic_cookie_key`] set
//! to the expected value. A plugin that recognises the cookie binds a socket
//! and writes one [`HandshakeLine`] to stdout; the host refuses to talk to
//! anything whose line does not carry the same versions.

use std::env;
use std::fmt;

use thiserror::Error;

use crate::endpoint::{SocketEndpoint, SocketParseError};

/// Version of the line format and frame layout itself.
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Wire protocol name advertised in the handshake line.
pub const WIRE_PROTOCOL: &str = "jsonrpc";

/// Name of the multi-service bundle the host dispenses after connecting.
pub const PLUGIN_BUNDLE: &str = "terramate-grpc";

/// Variable through which the host passes its host-service endpoint.
pub const HOST_ADDR_ENV: &str = "TM_PLUGIN_HOST_ADDR";

/// Constants both sides must agree on before any service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Application protocol version.
    pub protocol_version: u32,
    /// Environment variable carrying the cookie.
    pub magic_cookie_key: &'static str,
    /// Expected cookie value.
    pub magic_cookie_value: &'static str,
}

/// The handshake used by every terramate plugin.
pub const HANDSHAKE: HandshakeConfig = HandshakeConfig {
    protocol_version: 1,
    magic_cookie_key: "TM_PLUGIN_MAGIC_COOKIE",
    magic_cookie_value: "terramate",
};

impl HandshakeConfig {
    /// Returns true when `value` is exactly the expected cookie.
    #[must_use]
    pub fn cookie_matches(&self, value: Option<&str>) -> bool {
        value == Some(self.magic_cookie_value)
    }
}

/// Reports whether the current process was launched as a plugin.
///
/// Binaries call this at startup to decide between serving the plugin
/// protocol and behaving as an ordinary command.
#[must_use]
pub fn is_plugin_env() -> bool {
    let value = env::var(HANDSHAKE.magic_cookie_key).ok();
    HANDSHAKE.cookie_matches(value.as_deref())
}

/// The single stdout line a plugin prints once its socket is ready.
///
/// Layout: `CORE|APP|NETWORK|ADDRESS|PROTOCOL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeLine {
    core_version: u32,
    app_version: u32,
    endpoint: SocketEndpoint,
    protocol: String,
}

impl HandshakeLine {
    /// Builds the line a plugin advertises for `endpoint`.
    #[must_use]
    pub fn new(config: &HandshakeConfig, endpoint: &SocketEndpoint) -> Self {
        Self {
            core_version: CORE_PROTOCOL_VERSION,
            app_version: config.protocol_version,
            endpoint: endpoint.clone(),
            protocol: WIRE_PROTOCOL.to_owned(),
        }
    }

    /// Parses and validates a line read from a plugin's stdout.
    pub fn parse(config: &HandshakeConfig, line: &str) -> Result<Self, HandshakeError> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = trimmed.split('|').collect();
        let [core, app, network, address, protocol] = fields.as_slice() else {
            return Err(HandshakeError::Malformed {
                line: trimmed.to_owned(),
            });
        };

        let core_version = parse_version(core, trimmed)?;
        if core_version != CORE_PROTOCOL_VERSION {
            return Err(HandshakeError::CoreVersion {
                expected: CORE_PROTOCOL_VERSION,
                actual: core_version,
            });
        }
        let app_version = parse_version(app, trimmed)?;
        if app_version != config.protocol_version {
            return Err(HandshakeError::ProtocolVersion {
                expected: config.protocol_version,
                actual: app_version,
            });
        }
        if *protocol != WIRE_PROTOCOL {
            return Err(HandshakeError::WireProtocol {
                actual: (*protocol).to_owned(),
            });
        }
        let endpoint = SocketEndpoint::from_parts(network, address)?;

        Ok(Self {
            core_version,
            app_version,
            endpoint,
            protocol: (*protocol).to_owned(),
        })
    }

    /// Endpoint the plugin is listening on.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Application protocol version advertised by the plugin.
    #[must_use]
    pub const fn app_version(&self) -> u32 {
        self.app_version
    }
}

impl fmt::Display for HandshakeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.core_version,
            self.app_version,
            self.endpoint.network(),
            self.endpoint.address(),
            self.protocol
        )
    }
}

fn parse_version(field: &str, line: &str) -> Result<u32, HandshakeError> {
    field.parse().map_err(|_| HandshakeError::Malformed {
        line: line.to_owned(),
    })
}

/// Reasons a plugin's handshake line is refused.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The line does not have five `|`-separated fields.
    #[error("malformed handshake line '{line}'")]
    Malformed {
        /// Line as received.
        line: String,
    },
    /// The plugin speaks another core framing version.
    #[error("incompatible core protocol version {actual}, expected {expected}")]
    CoreVersion {
        /// Version this host supports.
        expected: u32,
        /// Version the plugin advertised.
        actual: u32,
    },
    /// The plugin was built against another application protocol.
    #[error("incompatible plugin protocol version {actual}, expected {expected}")]
    ProtocolVersion {
        /// Version this host supports.
        expected: u32,
        /// Version the plugin advertised.
        actual: u32,
    },
    /// The plugin does not speak the JSON line protocol.
    #[error("unsupported wire protocol '{actual}'")]
    WireProtocol {
        /// Protocol the plugin advertised.
        actual: String,
    },
    /// The advertised address is unusable.
    #[error("invalid plugin address: {0}")]
    Address(#[from] SocketParseError),
}

#[cfg(test)]
mod tests;
