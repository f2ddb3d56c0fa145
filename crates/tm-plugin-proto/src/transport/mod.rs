//! Socket plumbing shared by the plugin server and the host service.
//!
//! [`SocketListener`] binds an endpoint and accepts connections on a
//! background thread, handing each one to a [`ConnectionHandler`].

mod errors;
mod listener;
mod stream;

pub use self::errors::ListenerError;
pub use self::listener::{ListenerHandle, SocketListener};
pub use self::stream::{ConnectionHandler, ConnectionStream};

const LISTENER_TARGET: &str = "tm_plugin_proto::transport";
