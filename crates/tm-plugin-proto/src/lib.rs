//! Wire contract shared by the terramate host and its RPC plugins.
//!
//! Host and plugin binaries both link this crate so they agree on the
//! handshake constants, the message shapes of the five plugin services and
//! the reverse host service, and the framing used on the connection. The
//! transport is a connected byte stream (TCP or Unix domain socket) carrying
//! one JSON frame per line; see [`rpc`] for the frame layout.
//!
//! # Example
//!
//! ```rust
//! use tm_plugin_proto::handshake::{HANDSHAKE, HandshakeLine};
//! use tm_plugin_proto::SocketEndpoint;
//!
//! let endpoint = SocketEndpoint::tcp("127.0.0.1", 5311);
//! let line = HandshakeLine::new(&HANDSHAKE, &endpoint).to_string();
//! assert_eq!(line, "1|1|tcp|127.0.0.1:5311|jsonrpc");
//! ```

pub mod endpoint;
pub mod handshake;
pub mod messages;
pub mod methods;
pub mod rpc;
pub mod service;
pub mod status;
pub mod transport;

pub use self::endpoint::{SocketEndpoint, SocketParseError};
pub use self::rpc::{RpcConnection, RpcError, ServerStream};
pub use self::service::OutputSink;
pub use self::status::{Code, RpcStatus};
pub use self::transport::ConnectionStream;
