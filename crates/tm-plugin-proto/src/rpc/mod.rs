//! Line-delimited JSON RPC framing.
//!
//! Each frame is one JSON object followed by `\n`, tagged by `kind`:
//!
//! * `request { id, method, params }` opens a call.
//! * `item { id, item }` carries one element of a server stream.
//! * `response { id, result }` completes a unary call or ends a stream.
//! * `error { id, status }` fails a call.
//!
//! Calls on one connection never overlap: the caller reads every frame of a
//! call before sending the next request.

mod client;
mod error;
mod frame;
mod server;
#[cfg(test)]
mod tests;

pub use self::client::{RpcConnection, ServerStream};
pub use self::error::RpcError;
pub use self::frame::Frame;
pub use self::server::{
    ItemSink, Router, RouterHandler, Service, TypedSink, decode_params, encode_result,
    serve_connection,
};

const RPC_TARGET: &str = "tm_plugin_proto::rpc";
