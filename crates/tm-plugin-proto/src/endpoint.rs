//! Socket endpoints advertised in handshakes and host-address variables.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::transport::ConnectionStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Address of a listening RPC peer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket endpoint.
    Unix { path: Utf8PathBuf },
    /// TCP socket endpoint.
    Tcp { host: String, port: u16 },
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Loopback TCP endpoint with an OS-assigned port.
    #[must_use]
    pub fn loopback() -> Self {
        Self::tcp("127.0.0.1", 0)
    }

    /// Builds an endpoint from a bound TCP address.
    #[must_use]
    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        Self::tcp(addr.ip().to_string(), addr.port())
    }

    /// Rebuilds an endpoint from the network and address fields of a
    /// handshake line.
    pub fn from_parts(network: &str, address: &str) -> Result<Self, SocketParseError> {
        match network {
            "tcp" => {
                let (host, port) = address
                    .rsplit_once(':')
                    .ok_or_else(|| SocketParseError::MissingPort(address.to_owned()))?;
                let port = port
                    .parse()
                    .map_err(|_| SocketParseError::MissingPort(address.to_owned()))?;
                let host = host.trim_start_matches('[').trim_end_matches(']');
                if host.is_empty() {
                    return Err(SocketParseError::MissingHost(address.to_owned()));
                }
                Ok(Self::tcp(host, port))
            }
            "unix" => {
                if address.is_empty() {
                    return Err(SocketParseError::MissingUnixPath(address.to_owned()));
                }
                Ok(Self::unix(address))
            }
            other => Err(SocketParseError::UnsupportedScheme(other.to_owned())),
        }
    }

    /// Network name used in handshake lines.
    #[must_use]
    pub const fn network(&self) -> &'static str {
        match self {
            Self::Unix { .. } => "unix",
            Self::Tcp { .. } => "tcp",
        }
    }

    /// Address text used in handshake lines.
    #[must_use]
    pub fn address(&self) -> String {
        match self {
            Self::Unix { path } => path.to_string(),
            Self::Tcp { host, port } if host.contains(':') => format!("[{host}]:{port}"),
            Self::Tcp { host, port } => format!("{host}:{port}"),
        }
    }

    /// Returns the Unix socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }

    /// Opens a blocking connection to the endpoint.
    pub fn connect(&self) -> io::Result<ConnectionStream> {
        match self {
            Self::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))?;
                stream.set_nodelay(true)?;
                Ok(ConnectionStream::Tcp(stream))
            }
            #[cfg(unix)]
            Self::Unix { path } => Ok(ConnectionStream::Unix(UnixStream::connect(
                path.as_std_path(),
            )?)),
            #[cfg(not(unix))]
            Self::Unix { path } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unix sockets are unsupported for {path}"),
            )),
        }
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { .. } => write!(formatter, "tcp://{}", self.address()),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        match url.scheme() {
            "unix" => {
                let path = url.path();
                if path.is_empty() {
                    return Err(SocketParseError::MissingUnixPath(input.to_owned()));
                }
                Ok(Self::unix(path))
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| SocketParseError::MissingHost(input.to_owned()))?;
                let port = url
                    .port()
                    .ok_or_else(|| SocketParseError::MissingPort(input.to_owned()))?;
                Ok(Self::tcp(
                    host.trim_start_matches('[').trim_end_matches(']'),
                    port,
                ))
            }
            other => Err(SocketParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

/// Errors encountered while parsing a [`SocketEndpoint`] from text.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Scheme or network was not recognised.
    #[error("unsupported socket scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// TCP port was missing or not a number.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn display_unix_socket() {
        let endpoint = SocketEndpoint::unix(Utf8PathBuf::from("/tmp/tm-host.sock"));
        assert_eq!(endpoint.to_string(), "unix:///tmp/tm-host.sock");
    }

    #[test]
    fn display_round_trips_through_parse() {
        let endpoint = SocketEndpoint::tcp("127.0.0.1", 9000);
        let parsed: SocketEndpoint = endpoint.to_string().parse().expect("parse endpoint");
        assert_eq!(parsed, endpoint);
    }

    #[rstest]
    #[case::tcp("tcp", "127.0.0.1:4000", SocketEndpoint::tcp("127.0.0.1", 4000))]
    #[case::tcp_v6("tcp", "[::1]:4000", SocketEndpoint::tcp("::1", 4000))]
    #[case::unix("unix", "/tmp/p.sock", SocketEndpoint::unix("/tmp/p.sock"))]
    fn from_parts_accepts_handshake_fields(
        #[case] network: &str,
        #[case] address: &str,
        #[case] expected: SocketEndpoint,
    ) {
        let endpoint = SocketEndpoint::from_parts(network, address).expect("valid parts");
        assert_eq!(endpoint, expected);
        assert_eq!(endpoint.address(), address);
    }

    #[rstest]
    #[case::no_port("tcp", "127.0.0.1")]
    #[case::bad_port("tcp", "127.0.0.1:http")]
    #[case::empty_unix("unix", "")]
    #[case::unknown_network("udp", "127.0.0.1:53")]
    fn from_parts_rejects_malformed_fields(#[case] network: &str, #[case] address: &str) {
        assert!(SocketEndpoint::from_parts(network, address).is_err());
    }

    #[test]
    fn parse_rejects_unknown_scheme() {
        let error = "http://localhost:80"
            .parse::<SocketEndpoint>()
            .expect_err("http is not a socket scheme");
        assert!(matches!(error, SocketParseError::UnsupportedScheme(_)));
    }
}
